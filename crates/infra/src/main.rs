//! `bazaar-sim`: runs one moderation round against the in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;

use bazaar_auth::{Account, Actor, Role};
use bazaar_catalog::ListingDraft;
use bazaar_core::{AccountId, Source};
use bazaar_infra::{
    ActionCoordinator, BazaarConfig, ConsolidatedView, InMemoryAccountStore, InMemoryCatalogStore,
    ListingService, ModerationQueue, RoleRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BazaarConfig::from_env().context("loading configuration")?;
    bazaar_observability::init_with(config.log_format);
    tracing::info!(?config, "starting bazaar simulation");

    let catalog = Arc::new(InMemoryCatalogStore::new());
    let accounts = Arc::new(InMemoryAccountStore::new());

    let admin = Actor::new("admin", "admin@bazaar.test", Role::MainAdmin);
    let contributors = [
        Actor::new("amz", "amazon@bazaar.test", Role::AmazonSemiAdmin),
        Actor::new("loc", "local@bazaar.test", Role::LocalSemiAdmin),
        Actor::new("sw", "software@bazaar.test", Role::SoftwareSemiAdmin),
    ];

    for actor in contributors.iter().chain([&admin]) {
        accounts.seed(Account::new(actor.id.as_str(), actor.email.clone(), actor.role))?;
    }
    accounts.seed(Account::new("shopper", "shopper@bazaar.test", Role::User))?;

    let listings = ListingService::new(Arc::clone(&catalog));
    let mut submitted = Vec::new();
    if config.seed_demo {
        for (actor, source) in contributors.iter().zip(Source::ALL) {
            for n in 1..=2 {
                let id = listings
                    .create(actor, source, &demo_draft(source, n))
                    .await
                    .with_context(|| format!("seeding {source} listing {n}"))?;
                submitted.push((source, id));
            }
        }
    }

    let queue = ModerationQueue::new(Arc::clone(&catalog)).with_first_snapshot_timeout(config.feed_timeout);
    queue.start().await.context("starting moderation queue")?;
    let mut view = queue.watch();
    log_view(&view.borrow_and_update());

    let coordinator = ActionCoordinator::new(Arc::clone(&catalog)).tracking(queue.watch());
    for (i, (source, id)) in submitted.iter().enumerate() {
        let outcome = if i % 2 == 0 {
            coordinator.approve(&admin, *source, id).await
        } else {
            coordinator.reject(&admin, *source, id).await
        };
        if let Err(err) = outcome {
            tracing::warn!(%source, listing_id = %id, error = %err, "review action failed");
        }
    }

    // Let the pumps drain the last snapshots.
    let _ = tokio::time::timeout(Duration::from_millis(200), view.wait_for(ConsolidatedView::is_empty)).await;
    log_view(&queue.view());

    for source in Source::ALL {
        let public = listings.public_catalog(None, source).await?;
        tracing::info!(%source, approved = public.len(), "public catalog");
    }

    let registry = RoleRegistry::new(Arc::clone(&accounts));
    registry.start().await.context("starting role registry")?;
    let shopper = AccountId::new("shopper");
    registry.propose_role_change(&shopper, Role::LocalSemiAdmin)?;
    let updated = registry.submit_role_change(&admin, &shopper).await?;
    tracing::info!(account_id = %updated.id, role = %updated.role, "role reassigned");

    registry.stop();
    queue.shutdown();
    Ok(())
}

fn demo_draft(source: Source, n: u32) -> ListingDraft {
    ListingDraft {
        title: format!("{source} item {n}"),
        name: format!("{source}-{n}"),
        description: format!("Demo listing {n} for the {source} catalog"),
        quantity: i64::from(n) * 3,
        images: vec![format!("https://img.bazaar.test/{source}/{n}.png")],
        original_price: Decimal::from(100 * n),
        discount_percent: Decimal::from(10 * n),
        ..ListingDraft::default()
    }
}

fn log_view(view: &ConsolidatedView) {
    tracing::info!(pending = view.len(), errors = view.errors.len(), "moderation queue");
    for entry in &view.entries {
        tracing::info!(
            source = %entry.source,
            collection = entry.collection_name,
            listing_id = %entry.id(),
            title = %entry.listing.title,
            final_price = %entry.final_price,
            "pending review"
        );
    }
}
