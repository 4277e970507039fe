//! Racing executions of the same approval

mod util;

use approval_wallet::core::domain::Unit;
use approval_wallet::core::errors::WalletError;
use approval_wallet::crypto::signing::sign_message;
use std::sync::Arc;
use tokio::sync::Barrier;
use util::{dev_wallet, harness, native, RECIPIENT};

const RACERS: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_one_execution_wins() {
    let h = harness("2.0");
    let sender = dev_wallet(0);
    h.ledger.seed_balance(sender.address());
    let supply_before = h.ledger.total_supply();

    let approval = h
        .manager
        .prepare(sender.address(), RECIPIENT, "0.5", Unit::Native)
        .await
        .unwrap();
    let id = approval.id().to_string();
    let signature = sign_message(sender.private_key(), approval.message().as_bytes())
        .unwrap()
        .to_string();

    let barrier = Arc::new(Barrier::new(RACERS));
    let tasks: Vec<_> = (0..RACERS)
        .map(|_| {
            let barrier = barrier.clone();
            let manager = h.manager.clone();
            let (id, signature) = (id.clone(), signature.clone());
            tokio::spawn(async move {
                barrier.wait().await;
                manager.execute(&id, &signature).await
            })
        })
        .collect();
    let outcomes: Vec<Result<_, WalletError>> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let wins = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(outcomes
        .iter()
        .filter_map(|o| o.as_ref().err())
        .all(|e| matches!(e, WalletError::ApprovalAlreadyConsumed(_))));

    assert_eq!(h.ledger.balance(&sender.address()), native("1.5"));
    assert_eq!(h.ledger.history(&sender.address()).len(), 1);
    assert_eq!(h.ledger.total_supply(), supply_before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_spends_never_overdraw() {
    let h = harness("1.0");
    let sender = dev_wallet(0);
    h.ledger.seed_balance(sender.address());

    // ten approvals of 0.3 against a balance of 1.0: at most three settle
    let mut prepared = Vec::new();
    for _ in 0..10 {
        let approval = h
            .manager
            .prepare(sender.address(), RECIPIENT, "0.3", Unit::Native)
            .await
            .unwrap();
        let signature = sign_message(sender.private_key(), approval.message().as_bytes())
            .unwrap()
            .to_string();
        prepared.push((approval.id().to_string(), signature));
    }

    let mut tasks = Vec::new();
    for (id, signature) in prepared {
        let manager = h.manager.clone();
        tasks.push(tokio::spawn(async move { manager.execute(&id, &signature).await }));
    }
    let outcomes = futures::future::join_all(tasks).await;

    let mut settled = 0;
    for outcome in outcomes {
        match outcome.unwrap() {
            Ok(_) => settled += 1,
            Err(e) => assert!(matches!(e, WalletError::InsufficientBalance(_)), "{:?}", e),
        }
    }
    assert_eq!(settled, 3);
    assert_eq!(h.ledger.balance(&sender.address()), native("0.1"));
    assert_eq!(h.ledger.total_supply(), native("1.0"));
    assert_eq!(h.manager.pending_count(), 7);
}
