//! Registry events driving verification status refreshes.

mod common;

use std::sync::Arc;

use idvault_core::registry::{
    ClaimKind, MemoryRegistry, RegistryEventKind, VerificationStatus, DEVELOPMENT_CHAIN_ID,
};
use idvault_core::storage::MemoryStore;
use idvault_core::{SessionKeyCache, StaticSigner};

const HOLDER: &str = "0x1111111111111111111111111111111111111111";

#[tokio::test]
async fn test_events_drive_status_refresh() {
    let registry = MemoryRegistry::new(DEVELOPMENT_CHAIN_ID);
    let session = Arc::new(SessionKeyCache::new());
    let mut controller = common::controller(
        MemoryStore::new(),
        StaticSigner::new("0xSIG_A"),
        &session,
    )
    .with_events(registry.events());
    controller
        .create(common::sample_record())
        .await
        .expect("create");

    let mut watch = controller
        .watch_verification(&HOLDER.to_ascii_uppercase().replacen("0X", "0x", 1))
        .expect("watch");
    assert_eq!(
        controller
            .refresh_verification(&registry, HOLDER)
            .await
            .expect("refresh"),
        VerificationStatus::Unverified
    );

    registry.register(HOLDER);
    for kind in [ClaimKind::Age, ClaimKind::Nationality, ClaimKind::Student] {
        registry.verify_claim(HOLDER, kind);
    }

    let mut seen = Vec::new();
    while let Some(event) = watch.try_changed() {
        seen.push(event.kind);
    }
    assert_eq!(seen.first(), Some(&RegistryEventKind::IdentityRegistered));
    assert_eq!(seen.len(), 4);

    let status = controller
        .refresh_verification(&registry, HOLDER)
        .await
        .expect("refresh");
    assert_eq!(status, VerificationStatus::Verified);
    assert_eq!(
        controller.record().expect("record").verification_hints(),
        (true, true, true)
    );

    registry.revoke_claim(HOLDER, ClaimKind::Nationality);
    assert_eq!(
        watch.changed().await.map(|event| event.kind),
        Some(RegistryEventKind::ClaimRevoked)
    );
    let status = controller
        .refresh_verification(&registry, HOLDER)
        .await
        .expect("refresh");
    assert_eq!(status, VerificationStatus::Revoked);

    watch.unsubscribe();
    registry.verify_claim(HOLDER, ClaimKind::Nationality);
    assert!(watch.try_changed().is_none());
}

#[tokio::test]
async fn test_locked_vault_can_still_read_status() {
    let registry = MemoryRegistry::new(DEVELOPMENT_CHAIN_ID);
    registry.verify_claim(HOLDER, ClaimKind::Age);
    let session = Arc::new(SessionKeyCache::new());
    let mut controller = common::controller(
        MemoryStore::new(),
        StaticSigner::new("0xSIG_A"),
        &session,
    );

    let status = controller
        .refresh_verification(&registry, HOLDER)
        .await
        .expect("refresh");
    assert_eq!(status, VerificationStatus::PartiallyVerified);
    assert!(controller.record().is_err());
}
