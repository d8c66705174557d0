use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.root.path().join("vpcflow.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_credentials(&self) -> PathBuf {
        let path = self.root.path().join("cred.yml");
        fs::write(
            &path,
            "access_key_id: AKIAEXAMPLE\nsecret_access_key: secret\n",
        )
        .unwrap();
        path
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
