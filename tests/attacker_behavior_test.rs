// Attacker behaviour tests
//
// Drives the attacker policy turn by turn on a small two-sided field and
// checks the branch it takes and the move it returns.

mod common;

use capture_agents::attacker::{AttackBranch, AttackPolicy};
use capture_agents::config::Config;
use capture_agents::oracle::BoardOracle;
use capture_agents::random::FixedPick;
use capture_agents::types::{Move, Position};
use common::Scenario;
use std::collections::VecDeque;

// Red owns x < 5, Blue owns x >= 5
// Red spawn (1,4), Blue spawn (8,1)
// Red half: food (1,2) (4,2), capsule (4,1); Blue half: food (5,4) (8,4)
const FIELD: [&str; 6] = [
    "%%%%%%%%%%",
    "%1   .  .%",
    "% %% %%% %",
    "%.  .    %",
    "%   o   2%",
    "%%%%%%%%%%",
];

fn attacker(scenario: &Scenario) -> AttackPolicy {
    AttackPolicy::new(Config::default_hardcoded().attacker, &scenario.view())
}

#[test]
fn test_opening_heads_for_closest_enemy_pellet() {
    let scenario = Scenario::new(&FIELD, 0);
    let mut policy = attacker(&scenario);

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));

    assert_eq!(mv, Move::East, "Straight along the top corridor to (5,4)");
    assert_eq!(policy.state().last_branch, Some(AttackBranch::AttackFromHome));
    assert!(policy.state().opening_planned);
    assert_eq!(policy.state().opening.len(), 3);
}

#[test]
fn test_opening_is_followed_across_turns() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.hide_enemies();
    let mut policy = attacker(&scenario);

    for _ in 0..4 {
        let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));
        assert_eq!(mv, Move::East);
        scenario.advance(mv);
    }

    assert_eq!(scenario.position(), Position::new(5, 4));
    assert!(!scenario.state.board.food.contains(&Position::new(5, 4)));

    // The pellet eaten on the last step is counted on the next turn
    policy.choose_move(&scenario.view(), &mut FixedPick(0));
    assert_eq!(policy.state().food_eaten, 1);
    assert_eq!(policy.state().last_branch, Some(AttackBranch::AttackInEnemyField));
}

#[test]
fn test_flees_home_from_close_defender() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.place(0, Some(Position::new(7, 4)));
    scenario.place(1, Some(Position::new(8, 2)));
    let mut policy = attacker(&scenario);

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));

    assert_eq!(mv, Move::West);
    assert_eq!(policy.state().last_branch, Some(AttackBranch::AttackInEnemyField));
    assert_eq!(policy.state().flee_turns.len(), 1);
}

#[test]
fn test_capsule_effect_keeps_attacking_next_to_defender() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.place(0, Some(Position::new(7, 4)));
    scenario.place(1, Some(Position::new(8, 2)));
    let mut policy = attacker(&scenario);
    policy.state_mut().capsule_effect = 10;

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));

    assert_eq!(mv, Move::East, "Closest pellet at (8,4) instead of fleeing");
    assert!(policy.state().flee_turns.is_empty());
    assert_eq!(policy.state().capsule_effect, 9);
}

#[test]
fn test_return_detours_to_adjacent_pellet_when_safe() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.place(0, Some(Position::new(7, 4)));
    scenario.hide_enemies();
    let mut policy = attacker(&scenario);
    policy.state_mut().food_eaten = 6;

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));

    assert_eq!(policy.state().last_branch, Some(AttackBranch::Return));
    assert_eq!(mv, Move::East, "Grabs the pellet at (8,4) on the way");
}

#[test]
fn test_return_goes_straight_home_with_enemy_close() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.place(0, Some(Position::new(7, 4)));
    scenario.place(1, Some(Position::new(8, 2)));
    let mut policy = attacker(&scenario);
    policy.state_mut().food_eaten = 6;

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));

    assert_eq!(policy.state().last_branch, Some(AttackBranch::Return));
    assert_eq!(mv, Move::West);
}

#[test]
fn test_food_threshold_is_exclusive() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.place(0, Some(Position::new(7, 4)));
    scenario.hide_enemies();
    let mut policy = attacker(&scenario);
    policy.state_mut().food_eaten = 5;

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));

    assert_eq!(policy.state().last_branch, Some(AttackBranch::AttackInEnemyField));
    assert_eq!(mv, Move::East);
}

#[test]
fn test_food_counter_resets_at_home() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.place(0, Some(Position::new(6, 4)));
    scenario.hide_enemies();
    let mut policy = attacker(&scenario);

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));
    assert_eq!(mv, Move::West, "Closest pellet is (5,4)");
    scenario.advance(mv);

    policy.choose_move(&scenario.view(), &mut FixedPick(0));
    assert_eq!(policy.state().food_eaten, 1);

    scenario.place(0, Some(Position::new(4, 4)));
    policy.choose_move(&scenario.view(), &mut FixedPick(0));
    assert_eq!(policy.state().food_eaten, 0);
}

#[test]
fn test_eating_capsule_starts_effect_countdown() {
    // Agent 1 is the lowest Blue index, so Blue attacks Red's half
    let mut scenario = Scenario::new(&FIELD, 1);
    scenario.hide_enemies();
    let mut policy = attacker(&scenario);

    scenario.remove_item(Position::new(4, 1));
    policy.choose_move(&scenario.view(), &mut FixedPick(0));
    assert_eq!(policy.state().capsule_effect, 35);

    policy.choose_move(&scenario.view(), &mut FixedPick(0));
    assert_eq!(policy.state().capsule_effect, 34);
}

#[test]
fn test_repeated_fleeing_sends_attacker_to_rally_point() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.place(0, Some(Position::new(3, 4)));
    scenario.hide_enemies();
    let mut policy = attacker(&scenario);
    policy.state_mut().opening_planned = true;
    policy.state_mut().flee_turns = VecDeque::from(vec![10, 12, 14, 16, 18]);

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));

    assert_eq!(policy.state().last_branch, Some(AttackBranch::AttackFromHome));
    assert_eq!(policy.state().rally_point, Some(Position::new(4, 1)));
    assert_eq!(policy.state().forced_flee, 6);
    assert_eq!(mv, Move::East);

    scenario.advance(mv);
    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));
    assert_eq!(policy.state().forced_flee, 5);
    assert_eq!(mv, Move::South, "Keeps walking down column 4 to the rally point");
}

#[test]
fn test_chosen_move_is_always_legal() {
    let mut scenario = Scenario::new(&FIELD, 0);
    let mut policy = attacker(&scenario);

    for _ in 0..30 {
        let view = scenario.view();
        let mv = policy.choose_move(&view, &mut FixedPick(1));
        assert!(view.legal_moves().contains(&mv), "{} is illegal at {}", mv, scenario.position());
        scenario.advance(mv);
    }
}

#[test]
fn test_respawn_resets_opening_and_flee_window() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.hide_enemies();
    let mut policy = attacker(&scenario);
    policy.state_mut().opening_planned = true;
    policy.state_mut().opening = VecDeque::from(vec![Move::East, Move::East]);
    policy.state_mut().forced_flee = 4;

    // Back on the spawn cell (1,4) after being captured
    policy.choose_move(&scenario.view(), &mut FixedPick(0));

    assert_eq!(policy.state().forced_flee, 0);
    assert!(policy.state().opening.is_empty());
}

#[test]
fn test_rally_point_is_reselected_on_arrival() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.place(0, Some(Position::new(4, 1)));
    scenario.hide_enemies();
    let mut policy = attacker(&scenario);
    policy.state_mut().opening_planned = true;
    policy.state_mut().rally_point = Some(Position::new(4, 1));
    policy.state_mut().forced_flee = 3;

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));

    // From the bottom of column 4 the top end is now the farther one
    assert_eq!(policy.state().rally_point, Some(Position::new(4, 4)));
    assert_eq!(policy.state().forced_flee, 2);
    assert_eq!(mv, Move::North);
}

#[test]
fn test_flee_cluster_without_home_targets_stops() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.place(0, Some(Position::new(3, 4)));
    scenario.hide_enemies();
    for pos in [Position::new(1, 2), Position::new(4, 2), Position::new(4, 1)] {
        scenario.remove_item(pos);
    }
    let mut policy = attacker(&scenario);
    policy.state_mut().opening_planned = true;
    policy.state_mut().flee_turns = VecDeque::from(vec![10, 12, 14, 16, 18]);

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));

    assert_eq!(mv, Move::Stop);
    assert_eq!(policy.state().rally_point, None);
    assert_eq!(policy.state().forced_flee, 0);
}

#[test]
fn test_opening_is_dropped_on_enemy_ground() {
    let mut scenario = Scenario::new(&FIELD, 0);
    scenario.place(0, Some(Position::new(6, 4)));
    scenario.hide_enemies();
    let mut policy = attacker(&scenario);
    policy.state_mut().opening_planned = true;
    policy.state_mut().opening = VecDeque::from(vec![Move::East, Move::East, Move::East]);

    let mv = policy.choose_move(&scenario.view(), &mut FixedPick(0));

    assert!(policy.state().opening.is_empty());
    assert_eq!(policy.state().last_branch, Some(AttackBranch::AttackInEnemyField));
    assert_eq!(mv, Move::West, "Closest pellet is (5,4), not the cached opening");
}
