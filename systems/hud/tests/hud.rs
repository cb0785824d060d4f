use std::time::Duration;

use roboflow_core::{Command, GameState, LevelId, RobotKindId, WELCOME_BANNER};
use roboflow_system_hud::Hud;
use roboflow_world::{self as world, query, Session};

fn started() -> Session {
    let mut session = Session::default();
    let mut events = Vec::new();
    world::apply(&mut session, Command::ShowMenu, &mut events);
    world::apply(
        &mut session,
        Command::StartLevel {
            level: LevelId::FIRST,
        },
        &mut events,
    );
    session
}

#[test]
fn snapshot_reflects_a_fresh_level() {
    let session = started();
    let hud = Hud;
    let snapshot = hud.snapshot(&session);

    assert_eq!(hud.welcome_banner(&session), WELCOME_BANNER);
    assert_eq!(snapshot.state, GameState::Playing);
    assert!(!snapshot.run_over);
    assert_eq!(snapshot.level, LevelId::FIRST);
    assert_eq!(snapshot.level_name, "First Day at the Factory");
    assert_eq!(snapshot.timer, "03:00");
    assert!(!snapshot.low_time);
    assert_eq!(snapshot.score, "0");
    assert_eq!(snapshot.collisions_remaining, 3);
    assert_eq!(snapshot.products_target, 5);
    assert_eq!(snapshot.efficiency_percent, 0);
}

#[test]
fn toolbar_marks_locked_and_unaffordable_robots() {
    let session = started();
    let snapshot = Hud.snapshot(&session);

    let kinds: Vec<RobotKindId> = snapshot.robots.iter().map(|robot| robot.kind).collect();
    assert_eq!(kinds, RobotKindId::ALL.to_vec());

    let conveyor = &snapshot.robots[0];
    assert!(conveyor.unlocked);
    assert!(!conveyor.affordable, "fresh levels start with no score");
    assert!(snapshot.robots[1..].iter().all(|robot| !robot.unlocked));
}

#[test]
fn timer_warns_when_thirty_seconds_remain() {
    let mut session = started();
    let mut events = Vec::new();
    world::apply(
        &mut session,
        Command::Tick {
            dt: Duration::from_secs(149),
        },
        &mut events,
    );
    assert_eq!(query::time_remaining(&session), 31);
    assert!(!Hud.snapshot(&session).low_time);

    world::apply(
        &mut session,
        Command::Tick {
            dt: Duration::from_secs(1),
        },
        &mut events,
    );
    let snapshot = Hud.snapshot(&session);
    assert_eq!(snapshot.timer, "00:30");
    assert!(snapshot.low_time);
}

#[test]
fn collisions_remaining_counts_down() {
    let mut session = started();
    let mut events = Vec::new();
    world::apply(&mut session, Command::RecordCollision, &mut events);
    world::apply(&mut session, Command::RecordCollision, &mut events);

    let snapshot = Hud.snapshot(&session);
    assert_eq!(snapshot.collisions, 2);
    assert_eq!(snapshot.collisions_remaining, 1);
}

#[test]
fn exceeding_the_collision_limit_ends_the_run() {
    let mut session = started();
    let mut events = Vec::new();
    for _ in 0..4 {
        world::apply(&mut session, Command::RecordCollision, &mut events);
    }

    let snapshot = Hud.snapshot(&session);
    assert_eq!(snapshot.state, GameState::GameOver);
    assert!(snapshot.run_over);
    assert_eq!(snapshot.collisions_remaining, 0);
}
