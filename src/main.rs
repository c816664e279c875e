// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use anyhow::Context;
use clap::Parser;
use oxidity_arena::app::config::EngineSettings;
use oxidity_arena::app::logging::setup_logging;
use oxidity_arena::domain::error::AppError;
use oxidity_arena::engine::flash_loan::FlashLoanEngine;
use oxidity_arena::engine::forwarder::MetaTxForwarder;
use oxidity_arena::engine::genesis::{Genesis, WorldBuilder};
use oxidity_arena::engine::world::RollbackMode;

#[derive(Parser, Debug)]
#[command(author, version, about = "oxidity arena: boot a scenario world and report balances")]
struct Cli {
    /// Path to config file (default: config.{toml,yaml,...})
    #[arg(long)]
    config: Option<String>,

    /// Genesis file with assets and initial balances (overrides GENESIS_PATH)
    #[arg(long)]
    genesis: Option<String>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Log level or filter directive (overrides config/env)
    #[arg(long)]
    log_level: Option<String>,

    /// Rollback mode (overrides config/env)
    #[arg(long)]
    rollback_mode: Option<RollbackMode>,
}

fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut settings = EngineSettings::load_with_path(cli.config.as_deref())?;
    if let Some(mode) = cli.rollback_mode {
        settings.rollback_mode = mode;
    }
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.effective_log_level());
    setup_logging(&level, cli.json_logs);

    tracing::info!(
        target: "config",
        chain_id = settings.chain_id,
        rollback_mode = %settings.rollback_mode,
        max_call_depth = settings.max_call_depth,
        fee_policy = ?settings.fee_policy(),
        "Settings loaded"
    );

    let genesis = match cli.genesis.clone().or_else(|| settings.genesis_path()) {
        Some(path) => Genesis::load(&path)?,
        None => {
            tracing::warn!(target: "config", "No genesis file configured; booting an empty world");
            Genesis::default()
        }
    };

    let world = WorldBuilder::from_genesis(settings.engine_config(), &genesis)?.build();

    let lender = FlashLoanEngine::from_settings(&settings);
    tracing::info!(target: "flash_loan", engine = ?lender, "Flash loan engine ready");
    for entry in &genesis.forwarders {
        let fwd = MetaTxForwarder::from_settings(entry.forwarder, &settings);
        tracing::info!(
            target: "forwarder",
            forwarder = %fwd.address(),
            separator = %fwd.domain().separator(),
            targets = entry.targets.len(),
            "Forwarder domain ready"
        );
    }

    let report = serde_json::to_string_pretty(&world.report())
        .context("serialize balance report")?;
    println!("{report}");
    Ok(())
}
