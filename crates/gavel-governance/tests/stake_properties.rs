//! Property tests for stake accounting.

use gavel_governance::{BalanceBook, Governance, GovernanceConfig, ManualClock};
use gavel_types::{Address, Amount};
use proptest::prelude::*;

const OWNER: Address = Address::from_bytes([0xAA; 20]);
const TREASURY: Address = Address::from_bytes([0xEE; 20]);
const FUNDING: Amount = 1_000_000;

#[derive(Debug, Clone)]
enum Op {
    Stake { who: u8, amount: Amount },
    Unstake { who: u8, amount: Amount },
    Wait { blocks: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..3, 0u128..5_000).prop_map(|(who, amount)| Op::Stake { who, amount }),
        (0u8..3, 0u128..5_000).prop_map(|(who, amount)| Op::Unstake { who, amount }),
        (0u64..30).prop_map(|blocks| Op::Wait { blocks }),
    ]
}

fn participant(i: u8) -> Address {
    Address::from_bytes([i + 1; 20])
}

proptest! {
    #[test]
    fn stake_balance_matches_net_deposits(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let config = GovernanceConfig {
            minimum_stake: 100,
            stake_lock_duration: 20,
            ..GovernanceConfig::default()
        };
        let gov = Governance::new(OWNER, TREASURY, config, BalanceBook::new(), ManualClock::new(0)).unwrap();
        for i in 0..3 {
            gov.funds().mint(participant(i), FUNDING).unwrap();
        }

        let mut deposited = [0u128; 3];
        let mut withdrawn = [0u128; 3];

        for op in ops {
            match op {
                Op::Stake { who, amount } => {
                    let before = gov.snapshot();
                    match gov.stake(participant(who), amount) {
                        Ok(_) => deposited[who as usize] += amount,
                        Err(_) => prop_assert_eq!(gov.snapshot(), before),
                    }
                }
                Op::Unstake { who, amount } => {
                    let before = gov.snapshot();
                    match gov.unstake(participant(who), amount) {
                        Ok(_) => withdrawn[who as usize] += amount,
                        Err(_) => prop_assert_eq!(gov.snapshot(), before),
                    }
                }
                Op::Wait { blocks } => {
                    gov.clock().advance(blocks);
                }
            }
        }

        let mut pooled = 0u128;
        for i in 0..3u8 {
            let staked = gov.calculate_voting_power(&participant(i));
            prop_assert_eq!(staked, deposited[i as usize] - withdrawn[i as usize]);
            prop_assert_eq!(
                gov.funds().balance_of(&participant(i)),
                FUNDING - staked
            );
            pooled += staked;
        }
        prop_assert_eq!(gov.funds().balance_of(&TREASURY), pooled);
        prop_assert_eq!(gov.total_staked(), pooled);
    }

    #[test]
    fn unstake_inside_lock_always_fails(amount in 100u128..10_000, wait in 0u64..20) {
        let config = GovernanceConfig {
            minimum_stake: 100,
            stake_lock_duration: 20,
            ..GovernanceConfig::default()
        };
        let gov = Governance::new(OWNER, TREASURY, config, BalanceBook::new(), ManualClock::new(0)).unwrap();
        gov.funds().mint(participant(0), amount).unwrap();
        gov.stake(participant(0), amount).unwrap();

        gov.clock().advance(wait);
        prop_assert!(gov.unstake(participant(0), 1).is_err());
        prop_assert_eq!(gov.calculate_voting_power(&participant(0)), amount);
    }
}
