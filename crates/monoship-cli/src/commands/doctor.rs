use std::path::Path;

use monoship_core::{LockfileDocument, MonoshipConfig, config::CONFIG_FILE_NAME};
use monoship_engine::{CheckResult, DockerClient};

pub async fn doctor(root: &Path) -> anyhow::Result<()> {
    let client = DockerClient::new();
    let mut report = client.doctor().await;

    report.lockfile = match LockfileDocument::load(root) {
        Ok(lockfile) => CheckResult::ok(&format!(
            "{} workspace members",
            lockfile.workspace_members.len()
        )),
        Err(e) => CheckResult::fail(&e.to_string()),
    };

    let config_exists = root.join(CONFIG_FILE_NAME).exists();
    report.config_file = match MonoshipConfig::load(root) {
        Ok(_) if config_exists => CheckResult::ok("Found"),
        Ok(_) => CheckResult::ok("Not found (using defaults)"),
        Err(e) => CheckResult::fail(&e.to_string()),
    };

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed, see above for details");
    }

    Ok(())
}
