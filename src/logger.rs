use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Lines go to `path` (append) when given, stderr otherwise.
pub fn init(path: Option<&Path>) -> anyhow::Result<()> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

  let installed = match path {
    Some(path) => {
      let file = OpenOptions::new().create(true).append(true).open(path)?;
      builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
    }
    None => builder.with_writer(std::io::stderr).try_init(),
  };
  installed.map_err(|err| anyhow::anyhow!("logger init failed: {err}"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_logger_appends_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voxroom.log");
    init(Some(&path)).unwrap();

    tracing::info!(model = "model-a", "logger smoke line");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("logger smoke line"));
    assert!(contents.contains("model=\"model-a\""));
  }
}
