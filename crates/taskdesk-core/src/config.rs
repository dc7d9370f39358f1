use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::api::{
  ALLOWED_PER_PAGE,
  Sort,
  SortOrder
};

pub const API_URL_ENV_VAR: &str =
  "TASKDESK_API_URL";
const CONFIG_ENV_VAR: &str =
  "TASKDESKRC";
const CONFIG_FILE_NAME: &str =
  ".taskdeskrc";

const DEFAULTS: [(&str, &str); 6] = [
  ("api.url", "http://localhost:8000/api"),
  ("api.timeout", "30"),
  ("color", "on"),
  ("page.size", "10"),
  ("sort.by", "id"),
  ("sort.order", "asc")
];

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      map:          DEFAULTS
        .iter()
        .map(|(k, v)| {
          (k.to_string(), v.to_string())
        })
        .collect(),
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let path = resolve_config_path(
      config_override
    )?;
    if let Some(path) = path {
      info!(config = %path.display(), "loading config file");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no config file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  /// Applies environment overrides
  /// through `lookup` so callers can
  /// pass `std::env::var` or a fixed
  /// map.
  pub fn apply_env_overrides<F>(
    &mut self,
    lookup: F
  ) where
    F: Fn(&str) -> Option<String>
  {
    if let Some(url) =
      lookup(API_URL_ENV_VAR)
      && !url.trim().is_empty()
    {
      debug!(url = %url, "api url taken from environment");
      self.map.insert(
        "api.url".to_string(),
        url.trim().to_string()
      );
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  fn get_parsed<T>(
    &self,
    key: &str
  ) -> anyhow::Result<Option<T>>
  where
    T: FromStr,
    T::Err: std::fmt::Display
  {
    self
      .map
      .get(key)
      .map(|raw| {
        raw.trim().parse::<T>().map_err(
          |err| {
            anyhow!(
              "invalid value for \
               {key}: {raw} ({err})"
            )
          }
        )
      })
      .transpose()
  }

  pub fn api_url(&self) -> String {
    self
      .get("api.url")
      .unwrap_or_else(|| {
        DEFAULTS[0].1.to_string()
      })
  }

  pub fn api_timeout(
    &self
  ) -> anyhow::Result<Duration> {
    let secs = self
      .get_parsed::<u64>("api.timeout")?
      .unwrap_or(30);
    if secs == 0 {
      return Err(anyhow!(
        "api.timeout must be at least \
         one second"
      ));
    }
    Ok(Duration::from_secs(secs))
  }

  pub fn page_size(
    &self
  ) -> anyhow::Result<u32> {
    let size = self
      .get_parsed::<u32>("page.size")?
      .unwrap_or(10);
    if !ALLOWED_PER_PAGE.contains(&size)
    {
      return Err(anyhow!(
        "page.size must be one of \
         {ALLOWED_PER_PAGE:?}, got \
         {size}"
      ));
    }
    Ok(size)
  }

  pub fn sort(
    &self
  ) -> anyhow::Result<Sort> {
    let by = self
      .get("sort.by")
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
      .unwrap_or_else(|| {
        "id".to_string()
      });
    let order = self
      .get_parsed::<SortOrder>(
        "sort.order"
      )?
      .unwrap_or_default();
    Ok(Sort { by, order })
  }

  pub fn color(&self) -> bool {
    self
      .get_bool("color")
      .unwrap_or(true)
  }

  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    self.load_file_nested(
      path,
      &mut vec![]
    )
  }

  /// `chain` holds the canonical paths
  /// of the files currently being
  /// read, outermost first.
  #[tracing::instrument(skip(
    self, chain
  ))]
  fn load_file_nested(
    &mut self,
    path: &Path,
    chain: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let canonical =
      fs::canonicalize(&path)
        .unwrap_or_else(|_| {
          path.clone()
        });
    if chain.contains(&canonical) {
      return Err(anyhow!(
        "include cycle: {}",
        chain
          .iter()
          .chain([&canonical])
          .map(|p| {
            p.display().to_string()
          })
          .collect::<Vec<_>>()
          .join(" -> ")
      ));
    }

    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let line = raw_line
        .split_once('#')
        .map(|(before, _)| before)
        .unwrap_or(raw_line)
        .trim();

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path = base_dir
          .join(expand_tilde(
            Path::new(
              include_rest.trim()
            )
          ));
        if include_path.exists() {
          chain.push(canonical.clone());
          let loaded = self
            .load_file_nested(
              &include_path,
              chain
            );
          chain.pop();
          loaded?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(from_env) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if from_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      from_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping config \
       file"
    );
    return Ok(None);
  };
  let candidate =
    home.join(CONFIG_FILE_NAME);
  Ok(candidate.exists().then_some(candidate))
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
