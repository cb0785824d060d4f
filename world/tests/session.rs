use std::time::Duration;

use glam::Vec3;
use roboflow_core::{
    CatalogKey, CellCoord, Command, Event, GameOverReason, GameState, LevelId, Operation,
    PlacementError, PlacementTarget, RobotKindId, Rotation, SessionError,
};
use roboflow_world::{self as world, query, Catalogs, Level, RobotKind, Session, SessionConfig};

fn short_campaign(time_limit_seconds: u32, max_collisions: u32) -> Catalogs {
    Catalogs::new(
        vec![
            Level::new(
                LevelId::new(1),
                "Warm-up",
                "",
                1,
                time_limit_seconds,
                max_collisions,
                [RobotKindId::Conveyor],
            ),
            Level::new(
                LevelId::new(2),
                "Finale",
                "",
                1,
                time_limit_seconds,
                max_collisions,
                RobotKindId::ALL,
            ),
        ],
        vec![
            RobotKind::new(RobotKindId::Conveyor, "Conveyor Belt", 100, 0.02, 1, "#00FFFF"),
            RobotKind::new(RobotKindId::Arm, "Robotic Arm", 150, 0.03, 1, "#FF00FF"),
            RobotKind::new(RobotKindId::Forklift, "Forklift", 200, 0.015, 3, "#FFFF00"),
        ],
    )
    .expect("catalog is valid")
}

fn started(catalogs: Catalogs) -> Session {
    let mut session = Session::new(catalogs, SessionConfig::default());
    let mut events = Vec::new();
    world::apply(&mut session, Command::ShowMenu, &mut events);
    world::apply(
        &mut session,
        Command::StartLevel {
            level: LevelId::FIRST,
        },
        &mut events,
    );
    assert_eq!(query::game_state(&session), GameState::Playing);
    session
}

fn tick(session: &mut Session, millis: u64) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(
        session,
        Command::Tick {
            dt: Duration::from_millis(millis),
        },
        &mut events,
    );
    events
}

/// Routes the product in flight onto its own position so the next tick delivers it.
fn deliver_current(session: &mut Session) -> Vec<Event> {
    let product = query::products(session)
        .first()
        .cloned()
        .expect("a product is in flight");
    let mut events = Vec::new();
    world::apply(
        session,
        Command::AssignRoute {
            unit: product.id(),
            waypoints: vec![product.position()],
        },
        &mut events,
    );
    assert!(events.is_empty(), "route rejected: {events:?}");
    tick(session, 100)
}

fn place(session: &mut Session, kind: RobotKindId, target: PlacementTarget) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(session, Command::PlaceRobot { kind, target }, &mut events);
    events
}

fn single(events: &[Event], select: impl Fn(&Event) -> bool) -> &Event {
    let matches: Vec<&Event> = events.iter().filter(|event| select(event)).collect();
    assert_eq!(matches.len(), 1, "expected exactly one match in {events:?}");
    matches[0]
}

#[test]
fn finishing_with_forty_five_seconds_left_awards_1250_bonus() {
    let mut session = started(short_campaign(45, 2));

    let events = deliver_current(&mut session);

    let completed = single(&events, |event| matches!(event, Event::LevelCompleted { .. }));
    match completed {
        Event::LevelCompleted {
            level,
            breakdown,
            score,
        } => {
            assert_eq!(*level, LevelId::FIRST);
            assert_eq!(breakdown.time_bonus, 450);
            assert_eq!(breakdown.collision_bonus, 500);
            assert_eq!(breakdown.efficiency_bonus, 300);
            assert_eq!(breakdown.total(), 1250);
            assert_eq!(*score, 100 + 1250);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(query::game_state(&session), GameState::LevelComplete);
    assert_eq!(query::score(&session), 1350);
    assert!(!query::countdown_running(&session));
}

#[test]
fn collision_limit_is_exceeded_only_past_the_maximum() {
    let mut session = started(short_campaign(120, 2));
    let mut events = Vec::new();

    world::apply(&mut session, Command::RecordCollision, &mut events);
    world::apply(&mut session, Command::RecordCollision, &mut events);
    assert_eq!(query::collision_count(&session), 2);
    assert_eq!(query::game_state(&session), GameState::Playing);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::GameOver { .. })));

    events.clear();
    world::apply(&mut session, Command::RecordCollision, &mut events);
    assert_eq!(
        events,
        vec![
            Event::CollisionRecorded { count: 3, limit: 2 },
            Event::GameStateChanged {
                from: GameState::Playing,
                to: GameState::GameOver,
            },
            Event::GameOver {
                reason: GameOverReason::CollisionLimitExceeded,
            },
        ]
    );
}

#[test]
fn countdown_reaching_zero_ends_the_level_on_the_same_tick() {
    let mut session = started(short_campaign(1, 2));

    let events = tick(&mut session, 999);
    assert!(events.is_empty());
    assert_eq!(query::time_remaining(&session), 1);

    let events = tick(&mut session, 1);
    assert_eq!(
        events,
        vec![
            Event::CountdownAdvanced { remaining: 0 },
            Event::GameStateChanged {
                from: GameState::Playing,
                to: GameState::GameOver,
            },
            Event::GameOver {
                reason: GameOverReason::TimeExpired,
            },
        ]
    );
    assert_eq!(query::time_remaining(&session), 0);
}

#[test]
fn large_ticks_decrement_the_countdown_once_per_whole_second() {
    let mut session = started(Catalogs::reference());

    let events = tick(&mut session, 2_500);
    let decrements = events
        .iter()
        .filter(|event| matches!(event, Event::CountdownAdvanced { .. }))
        .count();
    assert_eq!(decrements, 2);
    assert_eq!(query::time_remaining(&session), 178);

    let _ = tick(&mut session, 500);
    assert_eq!(query::time_remaining(&session), 177);
}

#[test]
fn placement_checks_availability_then_funds_then_cell() {
    let mut session = started(Catalogs::reference());
    let outside = PlacementTarget::Ground(Vec3::new(40.0, 0.0, 40.0));

    assert_eq!(
        place(&mut session, RobotKindId::Arm, outside),
        vec![Event::RobotPlacementRejected {
            kind: RobotKindId::Arm,
            reason: PlacementError::KindNotAvailable {
                kind: RobotKindId::Arm,
            },
        }]
    );

    assert_eq!(
        place(&mut session, RobotKindId::Conveyor, outside),
        vec![Event::RobotPlacementRejected {
            kind: RobotKindId::Conveyor,
            reason: PlacementError::InsufficientScore {
                score: 0,
                cost: 100,
            },
        }]
    );

    let _ = deliver_current(&mut session);
    assert_eq!(query::score(&session), 100);
    assert_eq!(
        place(&mut session, RobotKindId::Conveyor, outside),
        vec![Event::RobotPlacementRejected {
            kind: RobotKindId::Conveyor,
            reason: PlacementError::InvalidCell,
        }]
    );
    assert_eq!(query::score(&session), 100, "rejected placements are free");
}

#[test]
fn placing_a_conveyor_debits_score_and_occupies_the_cell() {
    let mut session = started(Catalogs::reference());
    let _ = deliver_current(&mut session);
    assert_eq!(query::score(&session), 100);

    let ground = Vec3::new(1.2, 0.0, 2.7);
    let cell = query::screen_to_grid_coordinate(&session, ground).expect("ground maps to a cell");
    assert_eq!(cell, CellCoord::new(5, 7));

    let events = place(&mut session, RobotKindId::Conveyor, PlacementTarget::Ground(ground));
    assert_eq!(
        events,
        vec![Event::RobotPlaced {
            kind: RobotKindId::Conveyor,
            cell,
            cost: 100,
        }]
    );
    assert_eq!(query::score(&session), 0);
    assert_eq!(query::is_occupied(&session, cell), Ok(true));

    let placed = query::placed_robots(&session);
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].kind(), RobotKindId::Conveyor);
    assert_eq!(placed[0].position(), cell);
}

#[test]
fn occupied_cell_is_rejected_as_invalid() {
    let mut session = started(Catalogs::reference());
    let _ = deliver_current(&mut session);
    let _ = tick(&mut session, 1_000);
    let _ = deliver_current(&mut session);
    assert_eq!(query::score(&session), 200);

    let target = PlacementTarget::Cell(CellCoord::new(3, 3));
    let _ = place(&mut session, RobotKindId::Conveyor, target);
    assert_eq!(
        place(&mut session, RobotKindId::Conveyor, target),
        vec![Event::RobotPlacementRejected {
            kind: RobotKindId::Conveyor,
            reason: PlacementError::InvalidCell,
        }]
    );
    assert_eq!(query::score(&session), 100);
}

#[test]
fn only_one_product_is_ever_in_flight() {
    let mut session = started(Catalogs::reference());
    assert_eq!(query::products(&session).len(), 1);

    for _ in 0..5 {
        let events = tick(&mut session, 1_000);
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::ProductSpawned { .. })));
    }
    assert_eq!(query::products(&session).len(), 1);

    let events = deliver_current(&mut session);
    let _ = single(&events, |event| matches!(event, Event::Delivered { .. }));
    assert!(query::products(&session).is_empty());
    assert!(query::spawn_pending(&session));

    let events = tick(&mut session, 500);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::ProductSpawned { .. })));

    let events = tick(&mut session, 500);
    let _ = single(&events, |event| matches!(event, Event::ProductSpawned { .. }));
    assert_eq!(query::products(&session).len(), 1);
    assert!(!query::spawn_pending(&session));
}

#[test]
fn routed_product_travels_to_the_end_cell() {
    let mut session = started(Catalogs::reference());
    let unit = query::products(&session)[0].id();
    let end = query::end_position(&session);
    let mut events = Vec::new();
    world::apply(
        &mut session,
        Command::AssignRoute {
            unit,
            waypoints: vec![end],
        },
        &mut events,
    );

    let mut delivered = Vec::new();
    for _ in 0..20 {
        delivered.extend(
            tick(&mut session, 500)
                .into_iter()
                .filter(|event| matches!(event, Event::Delivered { .. })),
        );
    }
    assert_eq!(
        delivered,
        vec![Event::Delivered {
            unit,
            delivered: 1,
            target: 5,
        }]
    );
    assert_eq!(query::delivered_count(&session), 1);
    assert_eq!(query::efficiency_percent(&session), 20);
}

#[test]
fn pause_freezes_the_countdown_and_products() {
    let mut session = started(Catalogs::reference());
    let unit = query::products(&session)[0].id();
    let start = query::products(&session)[0].position();
    let end = query::end_position(&session);
    let mut events = Vec::new();
    world::apply(
        &mut session,
        Command::AssignRoute {
            unit,
            waypoints: vec![end],
        },
        &mut events,
    );

    world::apply(&mut session, Command::TogglePause, &mut events);
    assert_eq!(query::game_state(&session), GameState::Paused);

    assert!(tick(&mut session, 10_000).is_empty());
    assert_eq!(query::time_remaining(&session), 180);
    assert_eq!(query::products(&session)[0].position(), start);

    events.clear();
    world::apply(&mut session, Command::TogglePause, &mut events);
    assert_eq!(
        events,
        vec![Event::GameStateChanged {
            from: GameState::Paused,
            to: GameState::Playing,
        }]
    );
    let _ = tick(&mut session, 1_000);
    assert_eq!(query::time_remaining(&session), 179);
    assert_ne!(query::products(&session)[0].position(), start);
}

#[test]
fn pause_outside_of_play_is_ignored() {
    let mut session = Session::default();
    let mut events = Vec::new();
    world::apply(&mut session, Command::Pause, &mut events);
    world::apply(&mut session, Command::Resume, &mut events);
    assert!(events.is_empty());
    assert_eq!(query::game_state(&session), GameState::Loading);
}

#[test]
fn reset_level_keeps_score_and_restores_budgets() {
    let mut session = started(Catalogs::reference());
    let _ = deliver_current(&mut session);
    let mut events = Vec::new();
    world::apply(
        &mut session,
        Command::PlaceRobot {
            kind: RobotKindId::Conveyor,
            target: PlacementTarget::Cell(CellCoord::new(4, 4)),
        },
        &mut events,
    );
    world::apply(&mut session, Command::RecordCollision, &mut events);
    let _ = tick(&mut session, 3_000);
    let score = query::score(&session);

    events.clear();
    world::apply(&mut session, Command::ResetLevel, &mut events);

    assert!(events.contains(&Event::LevelReset {
        level: LevelId::FIRST
    }));
    let _ = single(&events, |event| matches!(event, Event::ProductSpawned { .. }));
    assert_eq!(query::score(&session), score);
    assert_eq!(query::time_remaining(&session), 180);
    assert_eq!(query::collision_count(&session), 0);
    assert_eq!(query::delivered_count(&session), 0);
    assert!(query::placed_robots(&session).is_empty());
    assert_eq!(query::is_occupied(&session, CellCoord::new(4, 4)), Ok(false));
    assert_eq!(query::game_state(&session), GameState::Playing);
}

#[test]
fn next_level_after_the_last_completes_the_game() {
    let mut session = started(short_campaign(60, 2));
    let _ = deliver_current(&mut session);
    assert_eq!(query::game_state(&session), GameState::LevelComplete);

    let mut events = Vec::new();
    world::apply(&mut session, Command::NextLevel, &mut events);
    assert_eq!(query::current_level(&session), LevelId::new(2));
    assert_eq!(query::game_state(&session), GameState::Playing);
    assert_eq!(query::time_remaining(&session), 60);

    let _ = deliver_current(&mut session);
    let score = query::score(&session);
    events.clear();
    world::apply(&mut session, Command::NextLevel, &mut events);

    assert_eq!(query::game_state(&session), GameState::GameComplete);
    assert_eq!(query::current_level(&session), LevelId::new(3));
    assert_eq!(events.last(), Some(&Event::GameCompleted { score }));
}

#[test]
fn restart_returns_to_menu_with_progress_cleared() {
    let mut session = started(short_campaign(60, 2));
    let _ = deliver_current(&mut session);
    let mut events = Vec::new();
    world::apply(&mut session, Command::NextLevel, &mut events);
    world::apply(&mut session, Command::RecordCollision, &mut events);

    events.clear();
    world::apply(&mut session, Command::RestartGame, &mut events);
    assert_eq!(
        events,
        vec![Event::GameStateChanged {
            from: GameState::Playing,
            to: GameState::Menu,
        }]
    );
    assert_eq!(query::current_level(&session), LevelId::FIRST);
    assert_eq!(query::score(&session), 0);
    assert_eq!(query::collision_count(&session), 0);
    assert!(query::products(&session).is_empty());
    assert!(!query::spawn_pending(&session));
    assert!(!query::countdown_running(&session));
}

#[test]
fn game_over_offers_a_way_back_to_the_menu() {
    let mut session = started(short_campaign(60, 0));
    let mut events = Vec::new();
    world::apply(&mut session, Command::RecordCollision, &mut events);
    assert_eq!(query::game_state(&session), GameState::GameOver);

    world::apply(&mut session, Command::ShowMenu, &mut events);
    assert_eq!(query::game_state(&session), GameState::Menu);
}

#[test]
fn commands_outside_their_states_are_rejected_without_side_effects() {
    let mut session = Session::default();
    let mut events = Vec::new();
    world::apply(&mut session, Command::ShowMenu, &mut events);

    events.clear();
    world::apply(
        &mut session,
        Command::PlaceRobot {
            kind: RobotKindId::Conveyor,
            target: PlacementTarget::Cell(CellCoord::new(0, 0)),
        },
        &mut events,
    );
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: SessionError::InvalidStateTransition {
                operation: Operation::PlaceRobot,
                state: GameState::Menu,
            },
        }]
    );

    events.clear();
    world::apply(&mut session, Command::NextLevel, &mut events);
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: SessionError::InvalidStateTransition {
                operation: Operation::NextLevel,
                state: GameState::Menu,
            },
        }]
    );
    assert_eq!(query::game_state(&session), GameState::Menu);
}

#[test]
fn starting_an_unknown_level_reports_the_missing_entry() {
    let mut session = Session::default();
    let mut events = Vec::new();
    world::apply(&mut session, Command::ShowMenu, &mut events);

    events.clear();
    world::apply(
        &mut session,
        Command::StartLevel {
            level: LevelId::new(9),
        },
        &mut events,
    );
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: SessionError::NotFound(CatalogKey::Level(LevelId::new(9))),
        }]
    );
    assert_eq!(query::game_state(&session), GameState::Menu);
}

#[test]
fn removing_and_rotating_robots() {
    let mut session = started(Catalogs::reference());
    let _ = deliver_current(&mut session);
    let cell = CellCoord::new(2, 6);
    let _ = place(&mut session, RobotKindId::Conveyor, PlacementTarget::Cell(cell));

    let mut events = Vec::new();
    world::apply(&mut session, Command::RotateRobot { cell }, &mut events);
    assert_eq!(
        events,
        vec![Event::RobotRotated {
            cell,
            rotation: Rotation::East,
        }]
    );
    assert_eq!(query::placed_robots(&session)[0].rotation(), Rotation::East);

    events.clear();
    world::apply(&mut session, Command::RemoveRobot { cell }, &mut events);
    assert_eq!(
        events,
        vec![Event::RobotRemoved {
            kind: RobotKindId::Conveyor,
            cell,
        }]
    );
    assert_eq!(query::score(&session), 0, "removal does not refund");
    assert!(query::placed_robots(&session).is_empty());

    events.clear();
    world::apply(&mut session, Command::RemoveRobot { cell }, &mut events);
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: SessionError::EmptyCell(cell),
        }]
    );
}

#[test]
fn routes_for_unknown_products_are_rejected() {
    let mut session = started(Catalogs::reference());
    let unit = query::products(&session)[0].id();
    let _ = deliver_current(&mut session);

    let mut events = Vec::new();
    world::apply(
        &mut session,
        Command::AssignRoute {
            unit,
            waypoints: vec![Vec3::ZERO],
        },
        &mut events,
    );
    assert_eq!(
        events,
        vec![Event::CommandRejected {
            reason: SessionError::UnknownUnit(unit),
        }]
    );
}

#[test]
fn catalogs_load_from_toml() {
    let catalogs = Catalogs::from_toml_str(
        r##"
        version = 1

        [[robots]]
        id = "conveyor"
        name = "Conveyor Belt"
        cost = 100
        speed = 0.02
        capacity = 1
        visual_tag = "#00FFFF"

        [[levels]]
        id = 1
        name = "Only Level"
        products_target = 2
        time_limit_seconds = 30
        max_collisions = 1
        robots = ["conveyor"]
        "##,
    )
    .expect("catalog parses");

    let session = started(catalogs);
    assert_eq!(query::time_remaining(&session), 30);
    assert_eq!(query::max_collisions(&session), 1);
    assert_eq!(
        query::level(&session).map(Level::name),
        Ok("Only Level")
    );
}

#[test]
fn huge_time_limit_saturates_the_level_bonus() {
    let mut session = started(short_campaign(u32::MAX, 2));

    let events = deliver_current(&mut session);

    match single(&events, |event| matches!(event, Event::LevelCompleted { .. })) {
        Event::LevelCompleted {
            breakdown, score, ..
        } => {
            assert_eq!(breakdown.time_bonus, u32::MAX);
            assert_eq!(breakdown.total(), u32::MAX);
            assert_eq!(*score, 100 + i64::from(u32::MAX));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(query::game_state(&session), GameState::LevelComplete);
}

#[test]
fn delivery_on_the_final_second_beats_the_countdown() {
    let mut session = started(short_campaign(1, 2));
    let product = query::products(&session)
        .first()
        .cloned()
        .expect("a product is in flight");
    let mut events = Vec::new();
    world::apply(
        &mut session,
        Command::AssignRoute {
            unit: product.id(),
            waypoints: vec![product.position()],
        },
        &mut events,
    );
    assert!(events.is_empty());

    let events = tick(&mut session, 1_000);

    let _ = single(&events, |event| matches!(event, Event::Delivered { .. }));
    match single(&events, |event| matches!(event, Event::LevelCompleted { .. })) {
        Event::LevelCompleted { breakdown, .. } => assert_eq!(breakdown.time_bonus, 10),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::GameOver { .. } | Event::CountdownAdvanced { .. })));
    assert_eq!(query::game_state(&session), GameState::LevelComplete);
    assert_eq!(query::time_remaining(&session), 1);
}

#[test]
fn pausing_during_the_spawn_delay_restarts_it_on_resume() {
    let mut session = started(Catalogs::reference());
    let _ = deliver_current(&mut session);
    assert!(query::spawn_pending(&session));

    assert!(!tick(&mut session, 500)
        .iter()
        .any(|event| matches!(event, Event::ProductSpawned { .. })));

    let mut events = Vec::new();
    world::apply(&mut session, Command::Pause, &mut events);
    assert!(!query::spawn_pending(&session));
    world::apply(&mut session, Command::Resume, &mut events);
    assert_eq!(query::game_state(&session), GameState::Playing);
    assert!(query::spawn_pending(&session));

    assert!(!tick(&mut session, 999)
        .iter()
        .any(|event| matches!(event, Event::ProductSpawned { .. })));
    let events = tick(&mut session, 1);
    let _ = single(&events, |event| matches!(event, Event::ProductSpawned { .. }));
    assert!(!query::spawn_pending(&session));
    assert_eq!(query::products(&session).len(), 1);
}
