use std::sync::Once;

use pretty_assertions::assert_eq;
use studio_core::{update, AppState, Effect, Msg, Profile};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn ada() -> Profile {
    Profile {
        id: "42".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        avatar: None,
    }
}

#[test]
fn referral_link_is_stored_and_persisted() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::ReferralCaptured("https://studio.example/?ref=partner7".to_string()),
    );

    assert_eq!(
        effects,
        vec![Effect::PersistSession {
            profile: None,
            referral: Some("partner7".to_string()),
        }]
    );
    assert_eq!(state.view().session.referral.as_deref(), Some("partner7"));
}

#[test]
fn link_without_code_only_sets_notice() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::ReferralCaptured("https://studio.example/".to_string()),
    );
    assert!(effects.is_empty());
    assert!(state.view().notice.is_some());
}

#[test]
fn sign_in_with_pending_referral_attributes_and_clears_it() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::SessionRestored {
            profile: None,
            referral: Some("partner7".to_string()),
        },
    );
    let (state, effects) = update(state, Msg::SignedIn(ada()));

    assert_eq!(
        effects,
        vec![
            Effect::AttributeReferral {
                email: "ada@example.com".to_string(),
                referral: "partner7".to_string(),
            },
            Effect::PersistSession {
                profile: Some(ada()),
                referral: None,
            },
        ]
    );
    let session = state.view().session;
    assert_eq!(session.profile, Some(ada()));
    assert_eq!(session.referral, None);
}

#[test]
fn sign_in_without_referral_only_persists() {
    init_logging();
    let (_, effects) = update(AppState::new(), Msg::SignedIn(ada()));
    assert_eq!(
        effects,
        vec![Effect::PersistSession {
            profile: Some(ada()),
            referral: None,
        }]
    );
}

#[test]
fn sign_out_clears_profile_once() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::SessionRestored {
            profile: Some(ada()),
            referral: None,
        },
    );
    let (state, effects) = update(state, Msg::SignedOut);
    assert_eq!(
        effects,
        vec![Effect::PersistSession {
            profile: None,
            referral: None,
        }]
    );

    let (state, effects) = update(state, Msg::SignedOut);
    assert!(effects.is_empty());
    assert_eq!(state.view().session.profile, None);
}

#[test]
fn tick_and_noop_change_nothing() {
    init_logging();
    let mut state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::Tick);
    assert!(effects.is_empty());
    assert_eq!(next, state);
    let (mut next, _) = update(next, Msg::NoOp);
    assert!(!next.consume_dirty());
    assert!(!state.consume_dirty());
}
