//! Subcommand handlers
//!
//! Static mode (`fetch`, and `check`/`create`/`stats` without discovery
//! flags) uses `[api]` from config. Discovery mode logs in as admin for an
//! environment and resolves org -> workspace -> connection first.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use crate::api::cache::DiscoveryCache;
use crate::api::directory::{org_display_names, ProviderEntry};
use crate::api::error::ApiError;
use crate::api::http::ApiHttpClient;
use crate::api::session::AdminSession;
use crate::cli::{Cli, Commands, Target};
use crate::config::Config;
use crate::numbers::endpoints::{self, partition_available};
use crate::numbers::fetcher::{fetch_available_numbers, FetchReport, StopReason};
use crate::numbers::phone::{normalize_phone_number, validate_phone_number, PhoneNumberSet};
use crate::numbers::snapshot;
use crate::numbers::stats;
use crate::output::{print_one, print_out};

/// Shared state for one CLI invocation
pub struct App {
    pub config: Config,
    pub json: bool,
    http: ApiHttpClient,
    cache: DiscoveryCache,
}

/// Where numbers are fetched from and endpoints are created under
struct ResolvedTarget {
    url: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct FetchSummary<'a> {
    url: &'a str,
    total: usize,
    pages: usize,
    stop: StopReason,
    fallback_url: Option<&'a str>,
    fetched_at: String,
    numbers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    number: String,
    normalized: String,
    valid: bool,
    available: bool,
}

#[derive(Debug, Serialize)]
struct CreateResult {
    created: Vec<String>,
    skipped: Vec<String>,
    response: Value,
}

impl App {
    pub fn new(config: Config, json: bool) -> Result<Self> {
        let http = ApiHttpClient::new(config.timeout()).context("Failed to build HTTP client")?;
        Ok(Self {
            config,
            json,
            http,
            cache: DiscoveryCache::new(),
        })
    }

    fn session<'a>(&'a mut self, env: &str) -> Result<AdminSession<'a>> {
        let env_config = self.config.environment(env)?;
        Ok(AdminSession::new(&self.http, env, env_config, &mut self.cache))
    }

    fn csv_path(&self) -> &Path {
        &self.config.settings.csv_file
    }

    /// Connection URL and admin token through discovery
    fn discover_target(&mut self, target: &Target) -> Result<ResolvedTarget> {
        let mut session = self.session(&target.env)?;
        let org_id = session
            .resolve_org(&target.org)?
            .ok_or_else(|| anyhow!("Organization '{}' not found", target.org))?;
        let url = session
            .phone_numbers_url(
                &org_id,
                &target.connection,
                target.workspace.as_deref(),
                target.provider.as_deref(),
            )?
            .ok_or_else(|| anyhow!("No workspaces found for '{}'", target.org))?;
        let token = session.token()?;
        Ok(ResolvedTarget { url, token })
    }

    fn static_target(&self, url: Option<&str>, token: Option<&str>) -> Result<ResolvedTarget> {
        let (url, token) = self.config.static_target(url, token)?;
        Ok(ResolvedTarget { url, token })
    }

    fn fetch(&self, target: &ResolvedTarget, limit: Option<usize>) -> Result<FetchReport> {
        let limit = limit.unwrap_or(self.config.settings.page_limit);
        if limit == 0 {
            bail!("--limit must be greater than zero");
        }
        let report = fetch_available_numbers(&self.http, &target.token, &target.url, limit)?;
        if report.is_unauthorized() {
            warn!("Token was rejected; results may be incomplete");
            eprintln!("Warning: Unauthorized - token is expired or invalid");
        }
        Ok(report)
    }

    /// Static target, or the discovered one when a selection is given
    fn resolve_target(
        &mut self,
        discovery: Option<&Target>,
        url: Option<&str>,
        token: Option<&str>,
    ) -> Result<ResolvedTarget> {
        match discovery {
            Some(t) => self.discover_target(t),
            None => self.static_target(url, token),
        }
    }

    /// Numbers from the CSV snapshot or a live fetch. A live result
    /// settles the snapshot the same way `fetch` does.
    fn free_numbers(
        &mut self,
        from_csv: bool,
        discovery: Option<&Target>,
    ) -> Result<PhoneNumberSet> {
        if from_csv {
            return snapshot::load(self.csv_path());
        }
        let target = self.resolve_target(discovery, None, None)?;
        let numbers = self.fetch(&target, None)?.all_numbers();
        self.settle_snapshot(&numbers, false)?;
        Ok(numbers)
    }

    /// Persist or drop the snapshot after a live fetch
    fn settle_snapshot(&self, numbers: &PhoneNumberSet, save_csv: bool) -> Result<()> {
        if save_csv {
            snapshot::save(numbers, self.csv_path())?;
            if !self.json {
                eprintln!("Saved snapshot to {}", self.csv_path().display());
            }
        } else if !numbers.is_empty() {
            snapshot::discard(self.csv_path())?;
        }
        Ok(())
    }

    fn print_report(&self, report: &FetchReport, numbers: Vec<String>, preview: usize) -> Result<()> {
        let summary = FetchSummary {
            url: &report.url,
            total: numbers.len(),
            pages: report.pages,
            stop: report.stop,
            fallback_url: report.fallback.as_ref().map(|f| f.url.as_str()),
            fetched_at: report.fetched_at.to_rfc3339(),
            numbers,
        };
        print_one(self.json, summary, |s| {
            let mut lines = vec![format!(
                "Found {} free number(s) over {} page(s)",
                s.total, s.pages
            )];
            if let Some(url) = s.fallback_url {
                lines.push(format!("(served from fallback {url})"));
            }
            let shown = if preview == 0 { s.numbers.len() } else { preview };
            lines.extend(s.numbers.iter().take(shown).cloned());
            if s.numbers.len() > shown {
                lines.push(format!("... and {} more", s.numbers.len() - shown));
            }
            lines.join("\n")
        })
    }

    fn run_fetch(
        &self,
        url: Option<&str>,
        token: Option<&str>,
        limit: Option<usize>,
        save_csv: bool,
        preview: usize,
    ) -> Result<()> {
        let target = self.static_target(url, token)?;
        let report = self.fetch(&target, limit)?;
        let numbers = report.all_numbers();
        self.settle_snapshot(&numbers, save_csv)?;
        self.print_report(&report, numbers.sorted(), preview)
    }

    fn run_orgs(&mut self, env: &str) -> Result<()> {
        let orgs = self.session(env)?.orgs()?;
        let names = org_display_names(&orgs);
        print_out(self.json, &names, |n| n.clone())
    }

    fn run_connections(&mut self, org: &str, env: &str) -> Result<()> {
        let mut session = self.session(env)?;
        let org_id = session
            .resolve_org(org)?
            .ok_or_else(|| anyhow!("Organization '{}' not found", org))?;
        let providers: Vec<ProviderEntry> = session.providers(&org_id)?;
        if providers.is_empty() && !self.json {
            eprintln!("No connections found for {org}");
        }
        print_out(self.json, &providers, |p| {
            format!(
                "{}\tconnection={}\tworkspace={}\tprovider={}",
                p.name, p.connection, p.workspace_id, p.provider_name
            )
        })
    }

    fn run_numbers(&mut self, target: &Target, search: Option<&str>, save_csv: bool) -> Result<()> {
        let resolved = self.discover_target(target)?;
        let report = self.fetch(&resolved, None)?;
        let numbers = report.all_numbers();
        self.settle_snapshot(&numbers, save_csv)?;
        let listed = match search {
            Some(term) => numbers.search(term),
            None => numbers.sorted(),
        };
        self.print_report(&report, listed, 0)
    }

    fn run_check(
        &mut self,
        candidates: &[String],
        from_csv: bool,
        discovery: Option<Target>,
    ) -> Result<()> {
        let free = self.free_numbers(from_csv, discovery.as_ref())?;
        let results: Vec<CheckResult> = candidates
            .iter()
            .map(|number| CheckResult {
                number: number.clone(),
                normalized: normalize_phone_number(number),
                valid: validate_phone_number(number),
                available: free.contains_number(number),
            })
            .collect();
        print_out(self.json, &results, |r| {
            let status = if r.available { "available" } else { "not available" };
            if r.valid {
                format!("{}\t{}", r.normalized, status)
            } else {
                format!("{}\t{} (invalid format)", r.number, status)
            }
        })
    }

    fn run_create(
        &mut self,
        numbers: &[String],
        base_url: Option<&str>,
        token: Option<&str>,
        discovery: Option<Target>,
        check: bool,
    ) -> Result<()> {
        let target = self.resolve_target(discovery.as_ref(), base_url, token)?;
        let requested: Vec<String> = numbers.iter().map(|n| n.trim().to_string()).collect();

        let (to_create, skipped) = if check {
            let report = self.fetch(&target, None)?;
            if report.is_unauthorized() {
                return Err(ApiError::Authentication {
                    body: format!("token rejected by {}", report.url),
                }
                .into());
            }
            let free = report.all_numbers();
            let split = partition_available(&requested, &free);
            if split.available.is_empty() {
                bail!("None of the requested numbers are currently available");
            }
            if !split.unavailable.is_empty() {
                warn!("Skipping unavailable numbers: {:?}", split.unavailable);
                eprintln!(
                    "Warning: skipping unavailable number(s): {}",
                    split.unavailable.join(", ")
                );
            }
            (split.available, split.unavailable)
        } else {
            (requested, Vec::new())
        };

        let response = endpoints::create(&self.http, &to_create, &target.url, &target.token)?;
        info!("Created {} endpoint(s)", to_create.len());
        print_one(
            self.json,
            CreateResult {
                created: to_create,
                skipped,
                response,
            },
            |r| format!("Created {} endpoint(s): {}", r.created.len(), r.created.join(", ")),
        )
    }

    fn run_stats(&mut self, from_csv: bool, discovery: Option<Target>) -> Result<()> {
        let numbers = self.free_numbers(from_csv, discovery.as_ref())?;
        let stats = stats::compute(&numbers);
        print_one(self.json, stats, |s| {
            let mut lines = vec![
                format!("Total numbers:    {}", s.total),
                format!("Unique prefixes:  {}", s.unique_prefixes),
                format!("Average length:   {:.1}", s.average_length),
                "Top prefixes:".to_string(),
            ];
            lines.extend(
                s.top_prefixes
                    .iter()
                    .map(|p| format!("  {}\t{}", p.prefix, p.count)),
            );
            if !s.top_state_codes.is_empty() {
                lines.push("Top +91 state codes:".to_string());
                lines.extend(
                    s.top_state_codes
                        .iter()
                        .map(|p| format!("  {}\t{}", p.prefix, p.count)),
                );
            }
            lines.join("\n")
        })
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let mut app = App::new(config, cli.json)?;

    match cli.command {
        Commands::Fetch {
            url,
            token,
            limit,
            save_csv,
            preview,
        } => app.run_fetch(url.as_deref(), token.as_deref(), limit, save_csv, preview),
        Commands::Orgs { env } => app.run_orgs(&env),
        Commands::Connections { org, env } => app.run_connections(&org, &env),
        Commands::Numbers {
            target,
            search,
            save_csv,
        } => app.run_numbers(&target, search.as_deref(), save_csv),
        Commands::Check {
            numbers,
            csv,
            discovery,
        } => app.run_check(&numbers, csv, discovery.into_target()),
        Commands::Create {
            numbers,
            base_url,
            token,
            discovery,
            check,
        } => app.run_create(
            &numbers,
            base_url.as_deref(),
            token.as_deref(),
            discovery.into_target(),
            check,
        ),
        Commands::Stats { csv, discovery } => app.run_stats(csv, discovery.into_target()),
    }
}
