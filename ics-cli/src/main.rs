use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ics_staking::allocation::delegation_messages_for_coins;
use ics_staking::{AllocationPlan, Coin, DelegatorRewards, Msg};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod fixture;

use fixture::{Fixture, FixtureKeeper};

#[derive(Parser)]
#[clap(
    name = "icsplan",
    about = "Inspect intent aggregation and delegation planning for a zone",
    version
)]
pub struct Cli {
    /// Zone-state fixture (JSON)
    #[clap(long, env = "ICS_STATE")]
    state: PathBuf,
    #[clap(long, env = "ICS_LOG_LEVEL", default_value = "info")]
    log_level: Level,
    /// Human-readable prefix of depositor addresses
    #[clap(long, env = "ICS_ACCOUNT_HRP", default_value = "quick")]
    hrp: String,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[clap(about = "Recompute a zone's aggregate intent from its depositors")]
    Aggregate {
        #[clap(long)]
        chain_id: String,
    },
    #[clap(about = "Plan how a deposit is delegated across validators")]
    Plan {
        #[clap(long)]
        chain_id: String,
        /// Amount in the zone's base denom
        #[clap(long)]
        amount: u128,
        /// Aggregate intents before planning
        #[clap(long)]
        aggregate: bool,
    },
    #[clap(about = "Issue reward withdrawals from a rewards query response")]
    Withdraw {
        #[clap(long)]
        chain_id: String,
        #[clap(long)]
        delegator: String,
        /// Delegator-total-rewards response (JSON)
        #[clap(long)]
        rewards: PathBuf,
    },
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    plan: &'a AllocationPlan,
    msgs: &'a [Msg],
}

#[derive(Serialize)]
struct WithdrawOutput<'a> {
    pending: u32,
    batches: &'a [Vec<Msg>],
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn aggregate(keeper: &mut FixtureKeeper, chain_id: &str) -> Result<()> {
    let mut zone = keeper.zone(chain_id)?;
    let aggregate = keeper.aggregate_intents(&mut zone)?;
    print_json(&aggregate)
}

fn plan(keeper: &mut FixtureKeeper, chain_id: &str, amount: u128, run_aggregate: bool) -> Result<()> {
    let mut zone = keeper.zone(chain_id)?;
    if run_aggregate {
        keeper.aggregate_intents(&mut zone)?;
    }
    let coin = Coin::new(zone.base_denom.clone(), amount);
    let plan = keeper.determine_plan_for_delegation(&zone, &coin)?;
    let msgs = delegation_messages_for_coins(&zone, &plan);
    info!(chain_id, amount, msgs = msgs.len(), "delegation plan ready");
    print_json(&PlanOutput {
        plan: &plan,
        msgs: &msgs,
    })
}

fn withdraw(
    keeper: &mut FixtureKeeper,
    chain_id: &str,
    delegator: &str,
    rewards: &Path,
) -> Result<()> {
    let raw = std::fs::read_to_string(rewards)
        .with_context(|| format!("reading rewards response {}", rewards.display()))?;
    let rewards: DelegatorRewards =
        serde_json::from_str(&raw).context("parsing rewards response")?;

    let mut zone = keeper.zone(chain_id)?;
    let pending = keeper.withdraw_delegation_rewards_for_response(&mut zone, delegator, &rewards)?;
    print_json(&WithdrawOutput {
        pending,
        batches: &keeper.submitter().batches,
    })
}

pub fn entry(opts: Cli) -> Result<()> {
    let mut keeper = Fixture::from_file(&opts.state)?.into_keeper(&opts.hrp)?;

    match opts.command {
        Commands::Aggregate { chain_id } => aggregate(&mut keeper, &chain_id),
        Commands::Plan {
            chain_id,
            amount,
            aggregate,
        } => plan(&mut keeper, &chain_id, amount, aggregate),
        Commands::Withdraw {
            chain_id,
            delegator,
            rewards,
        } => withdraw(&mut keeper, &chain_id, &delegator, &rewards),
    }
}

fn main() -> Result<()> {
    let opts = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(opts.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    entry(opts)
}
