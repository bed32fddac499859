// tests/campaign_flow_tests.rs
//
// End-to-end service flows against a real Postgres. Skipped unless
// DATABASE_URL is set (a `.env` file works too).

use regex::Regex;
use sqlx::PgPool;
use taverna_server::db::models::{CampaignStatus, CharacterSheet, CharacterStatus};
use taverna_server::db::MIGRATOR;
use taverna_server::error::AppError;
use taverna_server::service::campaigns::{self, CreateCampaignRequest, UpdateCampaignRequest};
use taverna_server::service::characters::{self, FullCharacterRequest, UpdateCharacterRequest};
use taverna_server::service::pcs::{self, PcRequest};
use taverna_server::service::{Caller, Pagination};

async fn pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPool::connect(&url).await.expect("DB connection failed");
    MIGRATOR.run(&pool).await.expect("migrations");
    Some(pool)
}

async fn user(db: &PgPool, name: &str) -> Caller {
    let tag: u64 = rand::random();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, email) VALUES ($1, $2) RETURNING id",
    )
    .bind(format!("{name}-{tag}"))
    .bind(format!("{name}-{tag}@example.com"))
    .fetch_one(db)
    .await
    .expect("insert user");
    Caller::new(id)
}

fn new_campaign(name: &str, max_players: i32) -> CreateCampaignRequest {
    CreateCampaignRequest {
        name: name.into(),
        description: "desc".into(),
        max_players,
        allow_homebrew: false,
    }
}

fn new_pc(name: &str, is_unique: bool) -> PcRequest {
    PcRequest {
        sheet: CharacterSheet {
            name: name.into(),
            level: 3,
            race: "Elf".into(),
            class: "Wizard".into(),
            ..Default::default()
        },
        is_homebrew: None,
        is_unique: Some(is_unique),
    }
}

fn conflict_message(err: AppError) -> String {
    match err {
        AppError::Conflict(msg) => msg,
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn dm_creates_campaign() {
    let Some(db) = pool().await else { return };
    let dm = user(&db, "dm").await;

    let view = campaigns::create(&db, dm, new_campaign("New Campaign", 6))
        .await
        .unwrap();
    assert!(view.campaign.id > 0);
    assert_eq!(view.campaign.dm_id, dm.user_id);
    assert_eq!(view.campaign.status, CampaignStatus::Planning);
    let code = view.invite_code.clone().unwrap();
    assert!(Regex::new(r"^[A-Z0-9]{4}-[A-Z0-9]{4}$").unwrap().is_match(&code));

    let defaulted = campaigns::create(&db, dm, new_campaign("Defaults", 0))
        .await
        .unwrap();
    assert_eq!(defaulted.campaign.max_players, 6);

    let blank = campaigns::create(&db, dm, new_campaign("   ", 6)).await;
    assert!(matches!(blank, Err(AppError::Validation { .. })));
    let too_big = campaigns::create(&db, dm, new_campaign("Big", 11)).await;
    assert!(matches!(too_big, Err(AppError::Validation { .. })));

    let page = campaigns::list_for_user(&db, dm, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, Some(2));
    assert!(page.items.iter().all(|s| s.invite_code.is_some()));
}

#[tokio::test]
async fn player_joins_with_code() {
    let Some(db) = pool().await else { return };
    let dm = user(&db, "dm").await;
    let first = user(&db, "first").await;
    let player = user(&db, "player").await;

    let view = campaigns::create(&db, dm, new_campaign("Join me", 5))
        .await
        .unwrap();
    let id = view.campaign.id;
    let code = view.invite_code.unwrap();

    campaigns::join_by_code(&db, first, &code).await.unwrap();
    let joined = campaigns::join_by_code(&db, player, &code.to_lowercase())
        .await
        .unwrap();
    assert_eq!(joined.id, id);

    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM campaign_players WHERE campaign_id = $1 AND status = 'active'",
    )
    .bind(id)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(active, 2);

    let again = campaigns::join_by_code(&db, player, &code).await.unwrap_err();
    assert_eq!(conflict_message(again), "player already in campaign");

    let own = campaigns::join_by_code(&db, dm, &code).await.unwrap_err();
    assert_eq!(
        conflict_message(own),
        "DM cannot join their own campaign as a player"
    );

    // players see the roster but not the code
    let seen = campaigns::get(&db, player, id).await.unwrap();
    assert!(seen.invite_code.is_none());
    assert_eq!(seen.players.as_ref().unwrap().len(), 2);
    assert!(matches!(
        campaigns::invite_code(&db, player, id).await,
        Err(AppError::Forbidden(_))
    ));

    let summaries = campaigns::list_for_user(&db, player, Pagination::default())
        .await
        .unwrap();
    assert_eq!(summaries.items.len(), 1);
    assert_eq!(summaries.items[0].player_count, 2);
    assert!(summaries.items[0].invite_code.is_none());
}

#[tokio::test]
async fn capacity_and_unknown_codes() {
    let Some(db) = pool().await else { return };
    let dm = user(&db, "dm").await;
    let a = user(&db, "a").await;
    let b = user(&db, "b").await;

    let view = campaigns::create(&db, dm, new_campaign("Tiny", 1)).await.unwrap();
    let code = view.invite_code.unwrap();

    campaigns::join_by_code(&db, a, &code).await.unwrap();
    let full = campaigns::join_by_code(&db, b, &code).await.unwrap_err();
    assert_eq!(conflict_message(full), "campaign is full");

    // a code nobody holds; the alphabet makes a collision vanishingly unlikely
    assert!(matches!(
        campaigns::join_by_code(&db, b, "0000-0000").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        campaigns::join_by_code(&db, b, "bad").await,
        Err(AppError::BadRequest { .. })
    ));
}

#[tokio::test]
async fn rotated_code_replaces_the_old_one() {
    let Some(db) = pool().await else { return };
    let dm = user(&db, "dm").await;
    let player = user(&db, "player").await;

    let view = campaigns::create(&db, dm, new_campaign("Rotate", 4)).await.unwrap();
    let id = view.campaign.id;
    let old = view.invite_code.unwrap();

    let fresh = campaigns::rotate_invite(&db, dm, id).await.unwrap();
    assert_ne!(fresh, old);
    assert_eq!(campaigns::invite_code(&db, dm, id).await.unwrap(), fresh);

    assert!(matches!(
        campaigns::join_by_code(&db, player, &old).await,
        Err(AppError::NotFound(_))
    ));
    campaigns::join_by_code(&db, player, &fresh).await.unwrap();

    assert!(matches!(
        campaigns::rotate_invite(&db, player, id).await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
async fn unique_pc_cannot_be_in_two_campaigns() {
    let Some(db) = pool().await else { return };
    let dm = user(&db, "dm").await;
    let owner = user(&db, "owner").await;

    let c10 = campaigns::create(&db, dm, new_campaign("Ten", 6)).await.unwrap();
    let c20 = campaigns::create(&db, dm, new_campaign("Twenty", 6)).await.unwrap();
    for view in [&c10, &c20] {
        campaigns::join_by_code(&db, owner, view.invite_code.as_deref().unwrap())
            .await
            .unwrap();
    }

    let pc = pcs::create(&db, owner, new_pc("Solo", true)).await.unwrap();
    let pc_id = pc.pc.id;

    let placed = characters::attach(&db, owner, c10.campaign.id, pc_id)
        .await
        .unwrap();
    assert_eq!(placed.status, CharacterStatus::Active);
    assert_eq!(placed.sheet.current_hp, Some(pc.pc.sheet.hp));

    let again = characters::attach(&db, owner, c10.campaign.id, pc_id)
        .await
        .unwrap_err();
    assert_eq!(conflict_message(again), "character already in campaign");

    let elsewhere = characters::attach(&db, owner, c20.campaign.id, pc_id).await;
    assert!(matches!(elsewhere, Err(AppError::Conflict(_))));
    let in_c20 = characters::list(&db, owner, c20.campaign.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(in_c20.total, Some(0));

    let availability = pcs::availability(&db, owner, pc_id).await.unwrap();
    assert!(availability.in_campaign);
    assert!(availability.blocking);
    assert_eq!(availability.campaign_id, Some(c10.campaign.id));

    let delete = pcs::delete(&db, owner, pc_id).await.unwrap_err();
    assert_eq!(conflict_message(delete), "PC is in active campaigns");

    characters::detach(&db, owner, c10.campaign.id, placed.id)
        .await
        .unwrap();
    pcs::delete(&db, owner, pc_id).await.unwrap();
}

#[tokio::test]
async fn retired_unique_snapshot_cannot_return_while_active_elsewhere() {
    let Some(db) = pool().await else { return };
    let dm = user(&db, "dm").await;
    let owner = user(&db, "owner").await;

    let first = campaigns::create(&db, dm, new_campaign("First", 6)).await.unwrap();
    let second = campaigns::create(&db, dm, new_campaign("Second", 6)).await.unwrap();
    for view in [&first, &second] {
        campaigns::join_by_code(&db, owner, view.invite_code.as_deref().unwrap())
            .await
            .unwrap();
    }
    let pc = pcs::create(&db, owner, new_pc("Once", true)).await.unwrap();
    let pc_id = pc.pc.id;

    let old = characters::attach(&db, owner, first.campaign.id, pc_id)
        .await
        .unwrap();
    let set_status = |status: &str| UpdateCharacterRequest {
        status: Some(status.into()),
        ..Default::default()
    };
    characters::update_play_state(&db, owner, first.campaign.id, old.id, set_status("dead"))
        .await
        .unwrap();
    let current = characters::attach(&db, owner, second.campaign.id, pc_id)
        .await
        .unwrap();

    // the DM is not the owner but still trips the rule
    let revived =
        characters::update_play_state(&db, dm, first.campaign.id, old.id, set_status("active"))
            .await
            .unwrap_err();
    assert!(conflict_message(revived).contains("already active"));

    let full = characters::update_full(
        &db,
        owner,
        first.campaign.id,
        old.id,
        FullCharacterRequest {
            sheet: old.sheet.clone(),
            status: Some("inactive".into()),
            campaign_notes: None,
        },
    )
    .await;
    assert!(matches!(full, Err(AppError::Conflict(_))));

    let in_play: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM campaign_characters \
          WHERE source_pc_id = $1 AND status IN ('active', 'inactive')",
    )
    .bind(pc_id)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(in_play, 1);

    // the live snapshot is still playable, and the old one returns once it retires
    characters::update_play_state(&db, owner, second.campaign.id, current.id, set_status("inactive"))
        .await
        .unwrap();
    characters::update_play_state(&db, owner, second.campaign.id, current.id, set_status("retired"))
        .await
        .unwrap();
    let back =
        characters::update_play_state(&db, owner, first.campaign.id, old.id, set_status("active"))
            .await
            .unwrap();
    assert_eq!(back.status, CharacterStatus::Active);
}

#[tokio::test]
async fn snapshots_diverge_from_their_pc() {
    let Some(db) = pool().await else { return };
    let dm = user(&db, "dm").await;
    let owner = user(&db, "owner").await;
    let stranger = user(&db, "stranger").await;

    let view = campaigns::create(&db, dm, new_campaign("Play", 6)).await.unwrap();
    let cid = view.campaign.id;
    campaigns::join_by_code(&db, owner, view.invite_code.as_deref().unwrap())
        .await
        .unwrap();

    let pc = pcs::create(&db, owner, new_pc("Mira", false)).await.unwrap();
    assert_eq!(pc.pc.sheet.proficiency_bonus, 2);
    assert_eq!(pc.attribute_modifiers.get("strength"), Some(&0));

    let ch = characters::attach(&db, owner, cid, pc.pc.id).await.unwrap();

    // the DM can play it too
    let hurt = characters::update_play_state(
        &db,
        dm,
        cid,
        ch.id,
        UpdateCharacterRequest {
            current_hp: Some(3),
            status: None,
            campaign_notes: Some("poisoned".into()),
        },
    )
    .await
    .unwrap();
    assert_eq!(hurt.sheet.current_hp, Some(3));
    assert_eq!(hurt.campaign_notes, "poisoned");
    assert_eq!(hurt.status, CharacterStatus::Active);

    let bad_status = characters::update_play_state(
        &db,
        owner,
        cid,
        ch.id,
        UpdateCharacterRequest {
            status: Some("asleep".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(bad_status, Err(AppError::Validation { .. })));

    let mut sheet = hurt.sheet.clone();
    sheet.level = 9;
    let synced = characters::update_full(
        &db,
        owner,
        cid,
        ch.id,
        FullCharacterRequest {
            sheet,
            status: Some("inactive".into()),
            campaign_notes: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(synced.sheet.level, 9);
    assert_eq!(synced.sheet.proficiency_bonus, 4);
    assert_eq!(synced.status, CharacterStatus::Inactive);
    assert_eq!(synced.campaign_notes, "poisoned");
    assert!(synced.last_sync.is_some());

    assert!(matches!(
        characters::get(&db, stranger, cid, ch.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        characters::list(&db, stranger, cid, Pagination::default()).await,
        Err(AppError::Forbidden(_))
    ));

    characters::detach(&db, owner, cid, ch.id).await.unwrap();
    let source = pcs::get(&db, owner, pc.pc.id).await.unwrap();
    assert_eq!(source.pc.sheet.level, 3);
    assert_eq!(source.pc.sheet.current_hp, pc.pc.sheet.current_hp);
    assert_eq!(source.pc.updated_at, pc.pc.updated_at);

    let available = characters::available(&db, owner, cid, Pagination::default())
        .await
        .unwrap();
    assert!(available.items.iter().any(|p| p.id == pc.pc.id));
}

#[tokio::test]
async fn leaving_drops_membership_and_characters() {
    let Some(db) = pool().await else { return };
    let dm = user(&db, "dm").await;
    let player = user(&db, "player").await;

    let view = campaigns::create(&db, dm, new_campaign("Leave", 6)).await.unwrap();
    let cid = view.campaign.id;
    let code = view.invite_code.unwrap();
    campaigns::join_by_code(&db, player, &code).await.unwrap();

    let pc = pcs::create(&db, player, new_pc("Brief", false)).await.unwrap();
    characters::attach(&db, player, cid, pc.pc.id).await.unwrap();

    assert!(matches!(
        campaigns::leave(&db, dm, cid).await,
        Err(AppError::Conflict(_))
    ));

    campaigns::leave(&db, player, cid).await.unwrap();
    let page = characters::list(&db, dm, cid, Pagination::default()).await.unwrap();
    assert_eq!(page.total, Some(0));
    assert!(matches!(
        campaigns::get(&db, player, cid).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        campaigns::leave(&db, player, cid).await,
        Err(AppError::NotFound(_))
    ));

    // rejoining is allowed
    campaigns::join_by_code(&db, player, &code).await.unwrap();
}

#[tokio::test]
async fn status_and_capacity_updates_are_checked() {
    let Some(db) = pool().await else { return };
    let dm = user(&db, "dm").await;
    let a = user(&db, "a").await;
    let b = user(&db, "b").await;
    let late = user(&db, "late").await;

    let view = campaigns::create(&db, dm, new_campaign("Arc", 4)).await.unwrap();
    let cid = view.campaign.id;
    let code = view.invite_code.unwrap();
    campaigns::join_by_code(&db, a, &code).await.unwrap();
    campaigns::join_by_code(&db, b, &code).await.unwrap();

    let shrink = campaigns::update(
        &db,
        dm,
        cid,
        UpdateCampaignRequest {
            max_players: Some(1),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(shrink, Err(AppError::Conflict(_))));

    let skip = campaigns::update(
        &db,
        dm,
        cid,
        UpdateCampaignRequest {
            status: Some("paused".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(skip, Err(AppError::Conflict(_))));

    let started = campaigns::update(
        &db,
        dm,
        cid,
        UpdateCampaignRequest {
            status: Some("active".into()),
            current_session: Some(1),
            allow_homebrew: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(started.campaign.status, CampaignStatus::Active);
    assert_eq!(started.campaign.current_session, 1);
    assert!(started.campaign.allow_homebrew);
    assert_eq!(started.campaign.name, "Arc");

    assert!(matches!(
        campaigns::update(&db, a, cid, UpdateCampaignRequest::default()).await,
        Err(AppError::Forbidden(_))
    ));

    campaigns::update(
        &db,
        dm,
        cid,
        UpdateCampaignRequest {
            status: Some("completed".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let late_join = campaigns::join_by_code(&db, late, &code).await.unwrap_err();
    assert_eq!(conflict_message(late_join), "campaign is completed");

    let reopen = campaigns::update(
        &db,
        dm,
        cid,
        UpdateCampaignRequest {
            status: Some("active".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(reopen, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn deleting_a_campaign_removes_everything() {
    let Some(db) = pool().await else { return };
    let dm = user(&db, "dm").await;
    let player = user(&db, "player").await;

    let view = campaigns::create(&db, dm, new_campaign("Doomed", 6)).await.unwrap();
    let cid = view.campaign.id;
    campaigns::join_by_code(&db, player, view.invite_code.as_deref().unwrap())
        .await
        .unwrap();
    let pc = pcs::create(&db, player, new_pc("Survivor", false)).await.unwrap();
    characters::attach(&db, player, cid, pc.pc.id).await.unwrap();

    assert!(matches!(
        campaigns::delete(&db, player, cid).await,
        Err(AppError::Forbidden(_))
    ));
    campaigns::delete(&db, dm, cid).await.unwrap();

    assert!(matches!(
        campaigns::get(&db, dm, cid).await,
        Err(AppError::NotFound(_))
    ));
    let leftovers: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM campaign_characters WHERE campaign_id = $1")
            .bind(cid)
            .fetch_one(&db)
            .await
            .unwrap();
    assert_eq!(leftovers, 0);

    // the PC itself survives and is free again
    let availability = pcs::availability(&db, player, pc.pc.id).await.unwrap();
    assert!(!availability.in_campaign);
}

#[tokio::test]
async fn pcs_are_private_to_their_owner() {
    let Some(db) = pool().await else { return };
    let owner = user(&db, "owner").await;
    let other = user(&db, "other").await;

    let pc = pcs::create(&db, owner, new_pc("Hidden", false)).await.unwrap();
    assert!(matches!(
        pcs::get(&db, other, pc.pc.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        pcs::delete(&db, other, pc.pc.id).await,
        Err(AppError::NotFound(_))
    ));

    let mut invalid = new_pc("", false);
    invalid.sheet.level = 21;
    match pcs::create(&db, owner, invalid).await {
        Err(AppError::Validation {
            details: Some(details),
            ..
        }) => {
            assert!(details.get("name").is_some());
            assert!(details.get("level").is_some());
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let mut req = new_pc("Hidden", false);
    req.sheet.level = 5;
    req.is_unique = None;
    let updated = pcs::update(&db, owner, pc.pc.id, req).await.unwrap();
    assert_eq!(updated.pc.sheet.proficiency_bonus, 3);
    assert!(!updated.pc.is_unique);

    let page = pcs::list(&db, owner, Pagination::new(1, 0)).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total, Some(1));
}
