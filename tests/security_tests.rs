#![cfg(feature = "server")]

mod common;

use std::collections::HashSet;

use common::{group_1019, init_tracing};
use dl_zkpp::protocol::{Prover, Verifier};
use dl_zkpp::server::{RoundPolicy, ServerState};
use dl_zkpp::{
    Challenge, CryptoProvider, Error, GroupParameters, ModPowProvider, Operand, Secret,
};
use rand_core::OsRng;

const ENROLLED_X: u64 = 0x6162;

fn policy(required: u32) -> RoundPolicy {
    RoundPolicy {
        required_valid_rounds: required,
        max_rounds: required,
        tolerated_invalid: 0,
    }
}

async fn enrolled_session(state: &ServerState, provider: &ModPowProvider) -> String {
    let hs = state.handshake().await.unwrap();
    let id = hs.client_id.unwrap();
    let y = provider
        .public_key(&Operand::from(ENROLLED_X), state.params().g(), state.params().p())
        .unwrap();
    state.submit_public_key(&id, y).await.unwrap();
    id
}

/// Runs one full attempt with a prover that only knows `x`.
async fn attempt(state: &ServerState, provider: &ModPowProvider, x: u64) -> bool {
    let id = enrolled_session(state, provider).await;
    let params = state.params().clone();
    let secret = Secret::from_operand(Operand::from(x));
    let prover = Prover::new(provider, &params, &secret);

    loop {
        let (commitment, nonce) = prover.commit().unwrap();
        let challenge = state
            .pick_choice(&id, commitment.value().clone())
            .await
            .unwrap();
        let proof = prover.respond(nonce, challenge).unwrap();
        let outcome = state.verify(&id, proof.value().clone()).await.unwrap();
        if !outcome.cont {
            break;
        }
    }

    state.authenticated(&id).await.unwrap()
}

fn rate(hits: usize, trials: usize) -> f64 {
    hits as f64 / trials as f64
}

#[tokio::test]
async fn wrong_secret_survives_about_half_of_single_rounds() {
    init_tracing();
    let state = ServerState::new(group_1019(), policy(1));
    let provider = ModPowProvider::new();

    let trials = 2000;
    let mut passed = 0;
    for _ in 0..trials {
        if attempt(&state, &provider, ENROLLED_X + 1).await {
            passed += 1;
        }
    }

    let rate = rate(passed, trials);
    assert!((0.44..=0.56).contains(&rate), "single-round pass rate {rate}");
    assert_eq!(state.session_count().await, 0);
}

#[tokio::test]
async fn wrong_secret_survives_k_rounds_with_probability_two_to_minus_k() {
    let state = ServerState::new(group_1019(), policy(4));
    let provider = ModPowProvider::new();

    let trials = 4000;
    let mut passed = 0;
    for _ in 0..trials {
        if attempt(&state, &provider, ENROLLED_X + 1).await {
            passed += 1;
        }
    }

    let rate = rate(passed, trials);
    assert!((0.04..=0.085).contains(&rate), "four-round pass rate {rate}");
}

#[tokio::test]
async fn honest_prover_is_always_accepted() {
    let state = ServerState::new(group_1019(), RoundPolicy::default());
    let provider = ModPowProvider::new();

    for _ in 0..50 {
        assert!(attempt(&state, &provider, ENROLLED_X).await);
    }
}

#[tokio::test]
async fn replayed_round_passes_only_when_challenge_repeats() {
    let state = ServerState::new(group_1019(), policy(1));
    let provider = ModPowProvider::new();
    let params = state.params().clone();
    let secret = Secret::from_operand(Operand::from(ENROLLED_X));
    let prover = Prover::new(&provider, &params, &secret);

    // capture one honest round
    let id = enrolled_session(&state, &provider).await;
    let (commitment, nonce) = prover.commit().unwrap();
    let captured = state
        .pick_choice(&id, commitment.value().clone())
        .await
        .unwrap();
    let proof = prover.respond(nonce, captured).unwrap();
    assert!(state.verify(&id, proof.value().clone()).await.unwrap().valid);
    assert!(state.authenticated(&id).await.unwrap());

    let trials = 2000;
    let mut passed = 0;
    for _ in 0..trials {
        let id = enrolled_session(&state, &provider).await;
        let challenge = state
            .pick_choice(&id, commitment.value().clone())
            .await
            .unwrap();
        let outcome = state.verify(&id, proof.value().clone()).await.unwrap();
        assert_eq!(outcome.valid, challenge == captured);
        if state.authenticated(&id).await.unwrap() {
            passed += 1;
        }
    }

    let rate = rate(passed, trials);
    assert!((0.44..=0.56).contains(&rate), "replay pass rate {rate}");
}

#[test]
fn ephemeral_exponents_do_not_repeat() {
    let params = GroupParameters::rfc5114_2048_256();
    let provider = ModPowProvider::new();

    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let r = provider.gen_r(params.p()).unwrap();
        assert!(seen.insert(r), "ephemeral exponent repeated");
    }
}

#[test]
fn commitments_do_not_repeat_across_rounds() {
    let params = group_1019();
    let provider = ModPowProvider::new();
    let secret = Secret::from_operand(Operand::from(ENROLLED_X));
    let prover = Prover::new(&provider, &params, &secret);

    // 1017 possible values of r; 20 draws collide with probability below 0.2
    let commitments: Vec<Operand> = (0..20)
        .map(|_| prover.commit().unwrap().0.value().clone())
        .collect();
    let distinct: HashSet<&Operand> = commitments.iter().collect();
    assert!(distinct.len() >= 15, "only {} distinct commitments", distinct.len());
}

#[test]
fn challenges_are_unbiased() {
    let params = group_1019();
    let provider = ModPowProvider::new();
    let y = Operand::from(5);
    let verifier = Verifier::new(&provider, &params, &y);

    let draws = 4000;
    let opening = (0..draws)
        .filter(|_| verifier.pick_challenge(&mut OsRng) == Challenge::Opening)
        .count();

    let rate = rate(opening, draws);
    assert!((0.45..=0.55).contains(&rate), "opening rate {rate}");
}

#[tokio::test]
async fn challenge_cannot_be_rerolled() {
    let state = ServerState::new(group_1019(), RoundPolicy::default());
    let provider = ModPowProvider::new();
    let id = enrolled_session(&state, &provider).await;

    state.pick_choice(&id, Operand::from(4)).await.unwrap();
    assert!(matches!(
        state.pick_choice(&id, Operand::from(8)).await,
        Err(Error::ProtocolViolation(_))
    ));
}

#[tokio::test]
async fn out_of_group_commitment_is_rejected() {
    let state = ServerState::new(group_1019(), RoundPolicy::default());
    let provider = ModPowProvider::new();
    let id = enrolled_session(&state, &provider).await;

    for c in [0u64, 1019, 5000] {
        assert!(matches!(
            state.pick_choice(&id, Operand::from(c)).await,
            Err(Error::InvalidOperand(_))
        ));
    }
}

#[tokio::test]
async fn decision_is_single_use() {
    let state = ServerState::new(group_1019(), RoundPolicy::default());
    let provider = ModPowProvider::new();
    let id = enrolled_session(&state, &provider).await;
    let params = state.params().clone();
    let secret = Secret::from_operand(Operand::from(ENROLLED_X));
    let prover = Prover::new(&provider, &params, &secret);

    loop {
        let (commitment, nonce) = prover.commit().unwrap();
        let challenge = state
            .pick_choice(&id, commitment.value().clone())
            .await
            .unwrap();
        let proof = prover.respond(nonce, challenge).unwrap();
        if !state.verify(&id, proof.value().clone()).await.unwrap().cont {
            break;
        }
    }

    assert!(state.authenticated(&id).await.unwrap());
    assert!(matches!(
        state.authenticated(&id).await,
        Err(Error::UnknownSession(_))
    ));
}

#[test]
fn secret_is_redacted_in_debug_output() {
    let secret = Secret::from_operand(Operand::from(ENROLLED_X));
    let rendered = format!("{secret:?}");
    assert!(!rendered.contains("6162"));
    assert!(rendered.contains("redacted"));
}
