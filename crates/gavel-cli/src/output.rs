//! Output formatting utilities.
//!
//! Pretty printing for CLI commands.

use colored::Colorize;
use gavel_governance::{GovernanceConfig, GovernanceEvent, Proposal, ProposalStatus, RecipientAllowlist};
use gavel_types::{Address, Amount, BlockHeight};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Format an amount with thousands separators.
pub fn format_amount(value: Amount) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format address (short version).
pub fn format_address_short(addr: &str) -> String {
    if addr.len() > 20 {
        format!("{}...{}", &addr[..12], &addr[addr.len() - 6..])
    } else {
        addr.to_string()
    }
}

fn format_status(status: ProposalStatus) -> String {
    match status {
        ProposalStatus::Active => status.as_str().bright_cyan().to_string(),
        ProposalStatus::Executed => status.as_str().green().to_string(),
        ProposalStatus::Rejected => status.as_str().red().to_string(),
    }
}

/// Print success message.
pub fn print_success(msg: &str) {
    println!("{}", format!("✓ {}", msg).green());
}

/// Print error message.
pub fn print_error(msg: &str) {
    eprintln!("{}", format!("✗ {}", msg).red());
}

/// Print info message.
pub fn print_info(msg: &str) {
    println!("{}", format!("ℹ {}", msg).blue());
}

/// Print full proposal details.
pub fn print_proposal(proposal: &Proposal, current_height: BlockHeight) {
    println!("{}", format!("Proposal #{}", proposal.id).bold());
    println!("{}", "=".repeat(50));
    println!("Title:        {}", proposal.title.bright_white());
    if !proposal.description.is_empty() {
        println!("Description:  {}", proposal.description);
    }
    println!("Proposer:     {}", proposal.proposer);
    println!("Recipient:    {}", proposal.recipient.to_string().bright_cyan());
    println!("Amount:       {}", format_amount(proposal.amount).bright_yellow());
    println!("Status:       {}", format_status(proposal.status));
    println!(
        "Window:       [{}, {})  current {}",
        proposal.start_height, proposal.end_height, current_height
    );
    println!("Yes weight:   {}", format_amount(proposal.yes_votes).green());
    println!("No weight:    {}", format_amount(proposal.no_votes).red());
    if let Some(height) = proposal.finalized_at {
        println!("Finalized at: {}", height);
    }
}

/// Print proposal table.
pub fn print_proposal_table(proposals: &[Proposal]) {
    #[derive(Tabled)]
    struct ProposalRow {
        #[tabled(rename = "ID")]
        id: u64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Yes")]
        yes: String,
        #[tabled(rename = "No")]
        no: String,
        #[tabled(rename = "Ends")]
        ends: BlockHeight,
        #[tabled(rename = "Status")]
        status: &'static str,
    }

    let rows: Vec<ProposalRow> = proposals
        .iter()
        .map(|p| ProposalRow {
            id: p.id,
            title: p.title.clone(),
            amount: format_amount(p.amount),
            yes: format_amount(p.yes_votes),
            no: format_amount(p.no_votes),
            ends: p.end_height,
            status: p.status.as_str(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

/// Print governance configuration.
pub fn print_config(config: &GovernanceConfig, owner: &Address, treasury: &Address) {
    println!("{}", "Governance Configuration".bold());
    println!("{}", "=".repeat(50));
    println!("Owner:               {}", owner);
    println!("Treasury:            {}", treasury);
    println!("Minimum stake:       {}", format_amount(config.minimum_stake));
    println!("Quorum:              {}%", config.quorum_percentage);
    println!("Voting period:       {} blocks", config.voting_period);
    println!("Stake lock duration: {} blocks", config.stake_lock_duration);
    match &config.recipient_allowlist {
        RecipientAllowlist::Open => println!("Recipients:          any"),
        RecipientAllowlist::Restricted(set) => {
            println!("Recipients:          {} allowed", set.len());
            for recipient in set {
                println!("  - {}", recipient);
            }
        }
    }
}

fn describe_event(event: &GovernanceEvent) -> String {
    match event {
        GovernanceEvent::Staked { participant, amount, total, lock_until, .. } => format!(
            "{} staked {} (total {}, locked until {})",
            format_address_short(&participant.to_string()),
            format_amount(*amount),
            format_amount(*total),
            lock_until
        ),
        GovernanceEvent::Unstaked { participant, amount, remaining, .. } => format!(
            "{} unstaked {} (remaining {})",
            format_address_short(&participant.to_string()),
            format_amount(*amount),
            format_amount(*remaining)
        ),
        GovernanceEvent::ProposalCreated { id, proposer, amount, recipient, end_height, .. } => format!(
            "#{} created by {}: {} to {} (voting ends {})",
            id,
            format_address_short(&proposer.to_string()),
            format_amount(*amount),
            format_address_short(&recipient.to_string()),
            end_height
        ),
        GovernanceEvent::VoteCast { id, voter, choice, weight, .. } => format!(
            "#{} {} voted {} with weight {}",
            id,
            format_address_short(&voter.to_string()),
            if *choice { "yes" } else { "no" },
            format_amount(*weight)
        ),
        GovernanceEvent::ProposalExecuted { id, recipient, amount, .. } => format!(
            "#{} executed: paid {} to {}",
            id,
            format_amount(*amount),
            format_address_short(&recipient.to_string())
        ),
        GovernanceEvent::ProposalRejected { id, .. } => format!("#{} rejected", id),
        GovernanceEvent::ConfigUpdated { field, value, .. } => format!("{} set to {}", field, value),
    }
}

/// Print the event journal.
pub fn print_events(events: &[GovernanceEvent]) {
    #[derive(Tabled)]
    struct EventRow {
        #[tabled(rename = "Height")]
        height: BlockHeight,
        #[tabled(rename = "Event")]
        kind: &'static str,
        #[tabled(rename = "Details")]
        details: String,
    }

    let rows: Vec<EventRow> = events
        .iter()
        .map(|e| EventRow {
            height: e.height(),
            kind: e.kind(),
            details: describe_event(e),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1_000), "1,000");
        assert_eq!(format_amount(100_000_000), "100,000,000");
        assert_eq!(format_amount(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_address_short() {
        let addr = Address::from_bytes([7u8; 20]).to_string();
        let short = format_address_short(&addr);
        assert!(short.starts_with("gavel1"));
        assert!(short.contains("..."));
        assert_eq!(format_address_short("0x12"), "0x12");
    }

    #[test]
    fn test_describe_vote() {
        let event = GovernanceEvent::VoteCast {
            id: 3,
            voter: Address::from_bytes([1u8; 20]),
            choice: false,
            weight: 2_500,
            height: 9,
        };
        let text = describe_event(&event);
        assert!(text.starts_with("#3"));
        assert!(text.contains("voted no"));
        assert!(text.contains("2,500"));
    }
}
