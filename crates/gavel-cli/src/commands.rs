//! CLI command definitions and dispatch.
//!
//! Each invocation loads the ledger, runs one operation and saves the
//! ledger only if that operation succeeded.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gavel_governance::proposal::ProposalDraft;
use gavel_governance::{ExecutionOutcome, ProposalStatus, RecipientAllowlist};
use gavel_storage::LedgerStore;
use gavel_types::{Address, Amount};

use crate::config::CliConfig;
use crate::ledger::LocalLedger;
use crate::output::*;

/// Main CLI.
#[derive(Parser, Debug)]
#[command(name = "gavel")]
#[command(about = "Gavel - stake-weighted governance ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Config file path
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ledger file (overrides config)
    #[arg(long, global = true, value_name = "FILE", env = "GAVEL_LEDGER")]
    pub ledger: Option<PathBuf>,

    /// Calling identity
    #[arg(short, long, global = true, env = "GAVEL_FROM")]
    pub from: Option<String>,

    /// Log level (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new ledger
    Init {
        /// Owner allowed to change configuration
        owner: String,
        /// Treasury pool address (defaults to config)
        #[arg(long)]
        treasury: Option<String>,
        /// Replace an existing ledger
        #[arg(long)]
        force: bool,
    },
    /// Credit host funds to an address (local ledgers only)
    Fund {
        address: String,
        amount: Amount,
    },
    /// Advance the block height
    Advance {
        #[arg(default_value = "1")]
        blocks: u64,
    },
    /// Lock funds as stake
    Stake {
        amount: Amount,
    },
    /// Withdraw unlocked stake
    Unstake {
        amount: Amount,
    },
    /// Create a treasury spending proposal
    Propose {
        /// Proposal title
        #[arg(short, long)]
        title: String,
        /// Proposal description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Requested amount
        amount: Amount,
        /// Payout recipient
        recipient: String,
    },
    /// Vote on a proposal
    Vote {
        id: u64,
        #[arg(value_enum)]
        choice: Choice,
    },
    /// Execute a proposal whose voting window has closed
    Execute {
        id: u64,
    },
    /// Owner-only configuration
    #[command(subcommand)]
    Admin(AdminCommands),
    /// Read ledger state
    #[command(subcommand)]
    Show(ShowCommands),
    /// List proposals
    Proposals {
        /// Only show proposals with this status
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
    },
    /// Write a default config file
    Config {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show committed governance events
    History {
        /// Show only the most recent N events
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

/// Admin commands.
#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Set the minimum stake
    MinStake { value: Amount },
    /// Set the quorum percentage
    Quorum { value: u8 },
    /// Set the voting period for new proposals
    VotingPeriod { value: u64 },
    /// Restrict payout recipients, or pass --open to lift the restriction
    Allowlist {
        #[arg(long, conflicts_with = "recipients")]
        open: bool,
        recipients: Vec<String>,
    },
}

/// Show commands.
#[derive(Subcommand, Debug)]
pub enum ShowCommands {
    /// Proposal details
    Proposal { id: u64 },
    /// Stake record (defaults to --from)
    Stake { address: Option<String> },
    /// Vote record (voter defaults to --from)
    Vote { id: u64, voter: Option<String> },
    /// Voting power (defaults to --from)
    Power { address: Option<String> },
    /// Host balance (defaults to --from)
    Balance { address: Option<String> },
    /// Governance configuration
    Config,
    /// Current block height
    Height,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    Yes,
    No,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    Active,
    Executed,
    Rejected,
}

impl From<StatusFilter> for ProposalStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Active => ProposalStatus::Active,
            StatusFilter::Executed => ProposalStatus::Executed,
            StatusFilter::Rejected => ProposalStatus::Rejected,
        }
    }
}

fn parse_address(s: &str) -> anyhow::Result<Address> {
    s.parse()
        .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", s, e))
}

struct Context {
    config: CliConfig,
    store: LedgerStore,
    from: Option<String>,
}

impl Context {
    fn caller(&self) -> anyhow::Result<Address> {
        let from = self
            .from
            .as_deref()
            .or(self.config.default_account.as_deref())
            .ok_or_else(|| anyhow::anyhow!("No caller: pass --from or set default_account"))?;
        parse_address(from)
    }

    fn address_or_caller(&self, address: Option<String>) -> anyhow::Result<Address> {
        match address {
            Some(a) => parse_address(&a),
            None => self.caller(),
        }
    }

    fn open(&self) -> anyhow::Result<LocalLedger> {
        LocalLedger::open(self.store.clone())
    }
}

/// Execute a parsed command.
pub fn execute(cli: Cli, config: CliConfig) -> anyhow::Result<()> {
    let ledger_path = cli.ledger.unwrap_or_else(|| config.ledger_path.clone());
    let ctx = Context {
        store: LedgerStore::new(ledger_path),
        config,
        from: cli.from,
    };

    match cli.command {
        Commands::Init { owner, treasury, force } => {
            let owner = parse_address(&owner)?;
            let treasury = match treasury {
                Some(t) => parse_address(&t)?,
                None => ctx.config.genesis.treasury_address()?,
            };
            let gov_config = ctx.config.genesis.governance_config();
            LocalLedger::init(ctx.store.clone(), owner, treasury, gov_config, force)?;
            print_success(&format!("Ledger created at {}", ctx.store.path().display()));
            print_info(&format!("Owner:    {}", owner));
            print_info(&format!("Treasury: {}", treasury));
        }

        Commands::Fund { address, amount } => {
            let address = parse_address(&address)?;
            let ledger = ctx.open()?;
            let balance = ledger.engine().funds().mint(address, amount)?;
            ledger.save()?;
            print_success(&format!(
                "Funded {} with {} (balance {})",
                address,
                format_amount(amount),
                format_amount(balance)
            ));
        }

        Commands::Advance { blocks } => {
            let ledger = ctx.open()?;
            let height = ledger.engine().clock().advance(blocks);
            ledger.save()?;
            print_success(&format!("Height is now {}", height));
        }

        Commands::Stake { amount } => {
            let caller = ctx.caller()?;
            let ledger = ctx.open()?;
            let record = ledger.engine().stake(caller, amount)?;
            ledger.save()?;
            print_success(&format!(
                "Staked {} (total {}, locked until height {})",
                format_amount(amount),
                format_amount(record.amount),
                record.lock_until
            ));
        }

        Commands::Unstake { amount } => {
            let caller = ctx.caller()?;
            let ledger = ctx.open()?;
            let record = ledger.engine().unstake(caller, amount)?;
            ledger.save()?;
            print_success(&format!(
                "Unstaked {} (remaining {})",
                format_amount(amount),
                format_amount(record.amount)
            ));
        }

        Commands::Propose { title, description, amount, recipient } => {
            let caller = ctx.caller()?;
            let recipient = parse_address(&recipient)?;
            let ledger = ctx.open()?;
            let id = ledger.engine().create_proposal(
                caller,
                ProposalDraft {
                    title,
                    description,
                    amount,
                    recipient,
                },
            )?;
            ledger.save()?;
            let end = ledger
                .engine()
                .get_proposal(id)
                .map(|p| p.end_height)
                .unwrap_or_default();
            print_success(&format!("Created proposal #{} (voting ends at height {})", id, end));
        }

        Commands::Vote { id, choice } => {
            let caller = ctx.caller()?;
            let ledger = ctx.open()?;
            let record = ledger.engine().vote(id, caller, choice == Choice::Yes)?;
            ledger.save()?;
            print_success(&format!(
                "Voted {} on #{} with weight {}",
                if record.choice { "yes" } else { "no" },
                id,
                format_amount(record.weight)
            ));
        }

        Commands::Execute { id } => {
            let ledger = ctx.open()?;
            let outcome = ledger.engine().execute_proposal(id)?;
            ledger.save()?;
            match outcome {
                ExecutionOutcome::Executed { recipient, amount } => print_success(&format!(
                    "Proposal #{} passed: paid {} to {}",
                    id,
                    format_amount(amount),
                    recipient
                )),
                ExecutionOutcome::Rejected => {
                    print_info(&format!("Proposal #{} did not pass; marked rejected", id))
                }
            }
        }

        Commands::Admin(cmd) => {
            let caller = ctx.caller()?;
            let ledger = ctx.open()?;
            let engine = ledger.engine();
            match cmd {
                AdminCommands::MinStake { value } => engine.update_minimum_stake(caller, value)?,
                AdminCommands::Quorum { value } => engine.update_quorum_percentage(caller, value)?,
                AdminCommands::VotingPeriod { value } => engine.update_voting_period(caller, value)?,
                AdminCommands::Allowlist { open, recipients } => {
                    let allowlist = if open {
                        RecipientAllowlist::Open
                    } else {
                        let set = recipients
                            .iter()
                            .map(|r| parse_address(r))
                            .collect::<anyhow::Result<_>>()?;
                        RecipientAllowlist::Restricted(set)
                    };
                    engine.set_recipient_allowlist(caller, allowlist)?
                }
            }
            ledger.save()?;
            print_success("Configuration updated");
        }

        Commands::Show(cmd) => show(&ctx, cmd)?,

        Commands::Proposals { status } => {
            let ledger = ctx.open()?;
            let proposals = match status {
                Some(filter) => ledger.engine().proposals_with_status(filter.into()),
                None => ledger.engine().list_proposals(),
            };
            if proposals.is_empty() {
                print_info("No proposals");
            } else {
                print_proposal_table(&proposals);
            }
        }

        Commands::Config { force } => {
            let path = cli.config.unwrap_or_else(CliConfig::config_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at '{}' (use --force to replace it)",
                    path.display()
                );
            }
            ctx.config.save(&path)?;
            print_success(&format!("Wrote config to {}", path.display()));
        }

        Commands::History { limit } => {
            let ledger = ctx.open()?;
            let events = ledger.engine().events();
            let skip = limit.map(|n| events.len().saturating_sub(n)).unwrap_or(0);
            if events.is_empty() {
                print_info("No events");
            } else {
                print_events(&events[skip..]);
            }
        }
    }

    Ok(())
}

fn show(ctx: &Context, cmd: ShowCommands) -> anyhow::Result<()> {
    let ledger = ctx.open()?;
    let engine = ledger.engine();

    match cmd {
        ShowCommands::Proposal { id } => match engine.get_proposal(id) {
            Some(p) => print_proposal(&p, engine.current_height()),
            None => print_info(&format!("Proposal #{} not found", id)),
        },
        ShowCommands::Stake { address } => {
            let address = ctx.address_or_caller(address)?;
            match engine.get_stake(&address) {
                Some(record) => {
                    let lock = if record.is_locked(engine.current_height()) {
                        format!("locked until {}", record.lock_until)
                    } else {
                        "unlocked".to_string()
                    };
                    println!("{}: {} ({})", address, format_amount(record.amount), lock);
                }
                None => print_info(&format!("{} has never staked", address)),
            }
        }
        ShowCommands::Vote { id, voter } => {
            let voter = ctx.address_or_caller(voter)?;
            match engine.get_vote(id, &voter) {
                Some(record) => println!(
                    "{} voted {} on #{} with weight {} at height {}",
                    voter,
                    if record.choice { "yes" } else { "no" },
                    id,
                    format_amount(record.weight),
                    record.cast_at
                ),
                None => print_info(&format!("{} has not voted on #{}", voter, id)),
            }
        }
        ShowCommands::Power { address } => {
            let address = ctx.address_or_caller(address)?;
            println!("{}", format_amount(engine.calculate_voting_power(&address)));
        }
        ShowCommands::Balance { address } => {
            let address = ctx.address_or_caller(address)?;
            println!("{}", format_amount(engine.funds().balance_of(&address)));
        }
        ShowCommands::Config => print_config(&engine.config(), &engine.owner(), &engine.treasury()),
        ShowCommands::Height => println!("{}", engine.current_height()),
    }

    Ok(())
}
