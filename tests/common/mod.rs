#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).expect("write temp bytes");
        path
    }
}

/// Meta-style export: English headers, one campaign pair, ten days.
pub fn facebook_export(days: u32) -> String {
    let mut out = String::from(
        "Date,Campaign Name,Ad Name,Amount Spent,Impressions,Reach,Link Clicks,Results,Country,Age,Gender,Device,Placement\n",
    );
    for day in 1..=days {
        out.push_str(&format!(
            "2024-01-{day:02},Spring Sale,Spring_Sale_v1,\"$1,{:03}.50\",{},{},{},{},Turkey,25-34,female,mobile,feed\n",
            day * 10,
            2000 + day * 10,
            1500,
            60 + day,
            6,
        ));
        out.push_str(&format!(
            "2024-01-{day:02},Brand Push,Brand_Video_final,40,1000,800,45,2,united states,35-44,male,desktop,stories\n"
        ));
    }
    out
}

/// Google-style export: Turkish headers, day-first dates, no reach column.
pub fn google_export(days: u32) -> String {
    let mut out = String::from("Tarih\tKampanya\tHarcama\tGosterim\tTiklama\tDonusumler\tUlke\n");
    for day in 1..=days {
        out.push_str(&format!(
            "{day:02}/01/2024\tSearch Generic\t25\t900\t30\t3\tTR\n"
        ));
    }
    out
}
