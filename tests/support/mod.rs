#![allow(dead_code)]

pub mod maintpred_env;

use std::path::{Path, PathBuf};

/// Write a settings file with a small, seeded forest so tests train quickly.
pub fn write_small_config(dir: &Path, model_path: &Path) -> PathBuf {
    let path = dir.join("maintpred.toml");
    let text = format!(
        "model_path = '{}'\n\n[training]\ndata_seed = 17\n\n[training.forest]\nn_trees = 8\n",
        model_path.display()
    );
    std::fs::write(&path, text).expect("write config");
    path
}
