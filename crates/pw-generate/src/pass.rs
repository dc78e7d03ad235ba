//! Generation-pass orchestration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use pw_cache::{Cache, CacheError};
use pw_client::{generate, ClaudeClient, ClientError};
use pw_core::{Directive, GenerationResult};
use pw_scan::scan_source;

/// Pass configuration.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Cache file shared with the injection pass.
    pub cache_path: PathBuf,
    /// Drop cache entries not addressed by this run's scan. Only safe when
    /// the full file set sharing the cache is passed in one run.
    pub prune: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(".promptweld.cache"),
            prune: false,
        }
    }
}

/// Per-file outcome.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// The scanned file.
    pub path: PathBuf,
    /// Directives found; zero when the file failed to parse or read.
    pub directives: usize,
    /// Directives already answered by the cache, skipped.
    pub cached: usize,
    /// Directives freshly generated this run.
    pub generated: usize,
    /// Directives whose generation failed; nothing written, retried next run.
    pub failed: usize,
    /// Whether the file could not be read or parsed.
    pub skipped: bool,
}

/// Whole-run outcome.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Per-file reports, in input order.
    pub files: Vec<FileReport>,
    /// Cache entry count after the merge.
    pub cache_entries: usize,
}

impl RunReport {
    /// Format as a short human-readable summary.
    pub fn format_summary(&self) -> String {
        let mut summary = String::new();
        for report in &self.files {
            if report.skipped {
                summary.push_str(&format!("  {}: skipped\n", report.path.display()));
                continue;
            }
            summary.push_str(&format!(
                "  {}: {} directive(s), {} cached, {} generated, {} failed\n",
                report.path.display(),
                report.directives,
                report.cached,
                report.generated,
                report.failed,
            ));
        }
        summary.push_str(&format!("Cache entries: {}\n", self.cache_entries));
        summary
    }

    /// Total failed directives across all files.
    pub fn total_failed(&self) -> usize {
        self.files.iter().map(|f| f.failed).sum()
    }
}

/// Generation pass errors. Per-file problems are not errors; they degrade
/// to zero-directive reports, and only failing to persist the cache is fatal.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Client construction failed (missing credentials).
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// The merged cache could not be persisted.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// The generation pass: a client plus a config, run over a file set.
pub struct GenerationPass {
    client: ClaudeClient,
    config: GenerateConfig,
}

impl GenerationPass {
    /// Create a pass with the given client and config.
    pub fn new(client: ClaudeClient, config: GenerateConfig) -> Self {
        Self { client, config }
    }

    /// Create from environment variables.
    pub fn from_env(config: GenerateConfig) -> Result<Self, GenerateError> {
        let client = ClaudeClient::from_env()?;
        Ok(Self::new(client, config))
    }

    /// Run the pass over the given files.
    ///
    /// Loads the cache once, skips directives it already answers, dispatches
    /// the rest concurrently per file, merges the successes, and rewrites
    /// the cache file atomically.
    pub async fn run(&self, files: &[PathBuf]) -> Result<RunReport, GenerateError> {
        let mut cache = Cache::load(&self.config.cache_path);
        let mut live = BTreeSet::new();
        let mut updates: Vec<(Directive, GenerationResult)> = Vec::new();
        let mut reports = Vec::new();

        for path in files {
            let (source, directives) = match read_and_scan(path) {
                Some(scanned) => scanned,
                None => {
                    reports.push(FileReport {
                        path: path.clone(),
                        directives: 0,
                        cached: 0,
                        generated: 0,
                        failed: 0,
                        skipped: true,
                    });
                    continue;
                }
            };

            live.extend(
                directives
                    .iter()
                    .map(|d| (d.cache_key(), d.prompt.clone())),
            );

            let (cached, pending): (Vec<_>, Vec<_>) =
                directives.into_iter().partition(|d| cache.contains(d));

            tracing::info!(
                file = %path.display(),
                cached = cached.len(),
                pending = pending.len(),
                "dispatching directives"
            );

            // Fan out all of this file's pending directives at once; each
            // result stands alone.
            let results = futures::future::join_all(
                pending.iter().map(|d| generate(&self.client, &source, d)),
            )
            .await;

            let mut generated = 0;
            let mut failed = 0;
            for (directive, result) in pending.into_iter().zip(results) {
                match result {
                    Some(result) => {
                        generated += 1;
                        updates.push((directive, result));
                    }
                    None => failed += 1,
                }
            }

            reports.push(FileReport {
                path: path.clone(),
                directives: cached.len() + generated + failed,
                cached: cached.len(),
                generated,
                failed,
                skipped: false,
            });
        }

        if self.config.prune {
            cache.retain(&live);
        }
        cache.merge(updates);
        cache.persist(&self.config.cache_path)?;

        Ok(RunReport {
            cache_entries: cache.len(),
            files: reports,
        })
    }
}

/// Scan the files without touching the network or the cache file.
///
/// Used by `--dry-run`: reports what a real run would dispatch.
pub fn scan_only(files: &[PathBuf], cache_path: &Path) -> RunReport {
    let cache = Cache::load(cache_path);
    let mut reports = Vec::new();

    for path in files {
        let Some((_, directives)) = read_and_scan(path) else {
            reports.push(FileReport {
                path: path.clone(),
                directives: 0,
                cached: 0,
                generated: 0,
                failed: 0,
                skipped: true,
            });
            continue;
        };
        let cached = directives.iter().filter(|d| cache.contains(d)).count();
        reports.push(FileReport {
            path: path.clone(),
            directives: directives.len(),
            cached,
            generated: 0,
            failed: 0,
            skipped: false,
        });
    }

    RunReport {
        cache_entries: cache.len(),
        files: reports,
    }
}

/// Read and scan one file; `None` degrades the file to zero directives.
/// No error propagates past the file boundary.
fn read_and_scan(path: &Path) -> Option<(String, Vec<Directive>)> {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            tracing::warn!(file = %path.display(), %err, "unreadable, skipping");
            return None;
        }
    };
    match scan_source(&source) {
        Ok(directives) => Some((source, directives)),
        Err(err) => {
            tracing::warn!(file = %path.display(), %err, "parse failed, treating as zero directives");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_scan_only_reports_cached_and_pending() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("subst.cache");
        let source = "fn cool_button() {\n    \"use prompt: a button\";\n}\n\nfn other() {\n    \"use prompt: another widget\";\n}\n";
        let file = write_fixture(dir.path(), "widgets.rs", source);

        // Seed the cache with one of the two directives.
        let directives = scan_source(source).unwrap();
        let mut cache = Cache::new();
        cache.merge(vec![(
            directives[0].clone(),
            GenerationResult::from_code("let _ = ();"),
        )]);
        cache.persist(&cache_path).unwrap();

        let report = scan_only(&[file], &cache_path);
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].directives, 2);
        assert_eq!(report.files[0].cached, 1);
        assert!(!report.files[0].skipped);
    }

    #[test]
    fn test_scan_only_skips_unparseable_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("subst.cache");
        let broken = write_fixture(dir.path(), "broken.rs", "fn broken( {");
        let missing = dir.path().join("missing.rs");

        let report = scan_only(&[broken, missing], &cache_path);
        assert_eq!(report.files.len(), 2);
        assert!(report.files.iter().all(|f| f.skipped));
        assert!(report.files.iter().all(|f| f.directives == 0));
    }

    #[tokio::test]
    async fn test_failed_generation_persists_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("subst.cache");
        let file = write_fixture(
            dir.path(),
            "widgets.rs",
            "fn cool_button() {\n    \"use prompt: a button\";\n}\n",
        );

        // A client pointed at a closed port: every request fails.
        let client = ClaudeClient::new(pw_client::ClaudeConfig {
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            max_tokens: 16,
            base_url: "http://127.0.0.1:9".to_string(),
        });
        let pass = GenerationPass::new(
            client,
            GenerateConfig {
                cache_path: cache_path.clone(),
                prune: false,
            },
        );

        let report = pass.run(&[file]).await.unwrap();
        assert_eq!(report.files[0].failed, 1);
        assert_eq!(report.files[0].generated, 0);

        // No cache entry under any key: the next run retries the directive.
        let cache = Cache::load(&cache_path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_summary_mentions_every_file() {
        let report = RunReport {
            files: vec![
                FileReport {
                    path: PathBuf::from("a.rs"),
                    directives: 2,
                    cached: 1,
                    generated: 1,
                    failed: 0,
                    skipped: false,
                },
                FileReport {
                    path: PathBuf::from("b.rs"),
                    directives: 0,
                    cached: 0,
                    generated: 0,
                    failed: 0,
                    skipped: true,
                },
            ],
            cache_entries: 7,
        };
        let summary = report.format_summary();
        assert!(summary.contains("a.rs"));
        assert!(summary.contains("b.rs: skipped"));
        assert!(summary.contains("Cache entries: 7"));
    }
}
