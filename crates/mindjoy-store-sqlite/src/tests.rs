//! Integration tests for `SqliteStore` and the core rules running on top of
//! it, against an in-memory database.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use mindjoy_core::{
  Error as CoreError, Mindjoy,
  clock::FixedClock,
  entitlement::{EntitlementRecord, SubscriptionStatus},
  gate::Access,
  goals::NewGoal,
  habit::{CustomHabit, DateRange, HabitCompletion, HabitRef, SelectedHabit, SystemHabit},
  item::{GoalStatus, Item, ItemBody, ItemEdit, ItemKind, ItemPatch, NewItem},
  principles::NewPrinciple,
  store::{ItemQuery, RecordStore, StoreError},
  tasks::{NewTask, Tasks},
};
use proptest::prelude::*;
use uuid::Uuid;

use crate::{Error, SqliteStore};

type App = Mindjoy<SqliteStore, FixedClock>;

fn start() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 9, 10, 12, 0, 0).unwrap() }

fn day() -> NaiveDate { start().date_naive() }

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn app() -> App { Mindjoy::with_clock(store().await, FixedClock::new(start())) }

fn new_task(title: &str, principle_id: Uuid) -> NewTask {
  NewTask { title: title.into(), principle_id, goal_id: None }
}

fn new_goal(title: &str, principle_id: Uuid) -> NewGoal {
  NewGoal { title: title.into(), principle_id, description: None }
}

async fn principle(app: &App, title: &str) -> Uuid {
  app
    .principles()
    .create(
      Uuid::nil(),
      NewPrinciple { title: title.into(), description: None },
      app.now(),
    )
    .await
    .unwrap()
    .item_id
}

/// Create `n` tasks on `day()` and return their ids in position order.
async fn seed_tasks(app: &App, owner: Uuid, n: usize) -> Vec<Uuid> {
  let p = Uuid::new_v4();
  let mut ids = Vec::new();
  for i in 0..n {
    let task = app
      .tasks()
      .create(owner, day(), new_task(&format!("task {i}"), p), app.now())
      .await
      .unwrap();
    ids.push(task.item_id);
  }
  ids
}

/// Ids in position order, asserting primacy and density on the way.
fn dense_ids(items: &[Item]) -> Vec<Uuid> {
  for (expected, item) in (0u32..).zip(items) {
    assert_eq!(item.position, expected, "positions must be 0..n");
  }
  items.iter().map(|i| i.item_id).collect()
}

async fn task_order(app: &App, owner: Uuid) -> Vec<Uuid> {
  dense_ids(&app.tasks().list(owner, day()).await.unwrap())
}

// ─── Raw store ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn item_roundtrip_and_query() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let body = ItemBody::Principle(mindjoy_core::item::PrincipleValue {
    title:       "Honesty".into(),
    description: Some("say what you mean".into()),
  });

  let item = s
    .create_item(NewItem { owner_id: owner, position: 0, created_at: start(), body })
    .await
    .unwrap();
  let fetched = s.get_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(fetched, item);

  let query = ItemQuery::new(owner, ItemKind::Principle);
  assert_eq!(s.count_items(&query).await.unwrap(), 1);
  assert!(s.query_items(&ItemQuery::new(owner, ItemKind::Goal)).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_and_delete_missing_item_report_false() {
  let s = store().await;
  assert!(!s.update_item(Uuid::new_v4(), ItemPatch::position(3)).await.unwrap());
  assert!(!s.delete_item(Uuid::new_v4()).await.unwrap());
  assert!(s.get_item(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn query_filters_by_date_range() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let p = Uuid::new_v4();
  for offset in 0..3 {
    let date = day() + Duration::days(offset);
    app.tasks().create(owner, date, new_task("t", p), app.now()).await.unwrap();
  }

  let query = ItemQuery::new(owner, ItemKind::Task).between(day(), day() + Duration::days(1));
  assert_eq!(app.store().count_items(&query).await.unwrap(), 2);
}

#[tokio::test]
async fn sql_filters_agree_with_in_memory_matching() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let stranger = Uuid::new_v4();
  let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());

  let g1 = app.goals().create(owner, new_goal("g1", p1), app.now()).await.unwrap().item_id;
  let g2 = app.goals().create(owner, new_goal("g2", p2), app.now()).await.unwrap().item_id;
  app.goals().deactivate(owner, g2).await.unwrap();

  for (offset, p, goal) in [(-1, p1, None), (0, p1, Some(g1)), (0, p2, None), (1, p2, Some(g1))] {
    let input = NewTask { title: "t".into(), principle_id: p, goal_id: goal };
    app.tasks().create(owner, day() + Duration::days(offset), input, app.now()).await.unwrap();
  }
  app.tasks().create(stranger, day(), new_task("theirs", p1), app.now()).await.unwrap();

  let mut everything = Vec::new();
  for who in [owner, stranger] {
    for kind in [ItemKind::Task, ItemKind::Goal] {
      everything.extend(app.store().query_items(&ItemQuery::new(who, kind)).await.unwrap());
    }
  }
  assert_eq!(everything.len(), 7);

  let queries = [
    ItemQuery::new(owner, ItemKind::Task),
    ItemQuery::new(owner, ItemKind::Task).on(day()),
    ItemQuery::new(owner, ItemKind::Task).between(day(), day() + Duration::days(1)),
    ItemQuery::new(owner, ItemKind::Task).with_principle(p1),
    ItemQuery::new(owner, ItemKind::Task).on(day()).with_goal(g1),
    ItemQuery::new(owner, ItemKind::Goal).with_status(GoalStatus::Inactive),
    ItemQuery::new(owner, ItemKind::Goal).with_principle(p1),
    ItemQuery::new(stranger, ItemKind::Task).on(day()),
  ];
  for query in &queries {
    let mut from_sql: Vec<Uuid> =
      app.store().query_items(query).await.unwrap().iter().map(|i| i.item_id).collect();
    let mut in_memory: Vec<Uuid> =
      everything.iter().filter(|i| query.matches(i)).map(|i| i.item_id).collect();
    from_sql.sort();
    in_memory.sort();
    assert!(!in_memory.is_empty(), "{query:?} should select something");
    assert_eq!(from_sql, in_memory, "{query:?}");
    assert_eq!(app.store().count_items(query).await.unwrap(), in_memory.len() as u64);
  }
}

// ─── Tasks ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tasks_fill_positions_in_order() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 4).await;
  assert_eq!(task_order(&app, owner).await, ids);
}

#[tokio::test]
async fn fifth_task_exceeds_capacity() {
  let app = app().await;
  let owner = Uuid::new_v4();
  seed_tasks(&app, owner, 4).await;

  let err = app
    .tasks()
    .create(owner, day(), new_task("one too many", Uuid::new_v4()), app.now())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::CapacityExceeded { kind: ItemKind::Task, max: 4 }));

  // Another day has its own budget.
  app
    .tasks()
    .create(owner, day() + Duration::days(1), new_task("tomorrow", Uuid::new_v4()), app.now())
    .await
    .unwrap();
}

#[tokio::test]
async fn secondary_without_primary_is_refused() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 2).await;
  // Simulate a lost primary left behind by another session.
  app.store().delete_item(ids[0]).await.unwrap();

  let err = app
    .tasks()
    .create(owner, day(), new_task("orphan", Uuid::new_v4()), app.now())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::PrimaryMissing));
}

#[tokio::test]
async fn removing_secondary_closes_gap() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 4).await;

  let result = app.tasks().remove(owner, ids[1]).await.unwrap();
  assert!(result.is_complete());
  assert_eq!(result.applied.len(), 2);
  assert_eq!(task_order(&app, owner).await, vec![ids[0], ids[2], ids[3]]);
}

#[tokio::test]
async fn removing_primary_clears_the_day() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 3).await;
  let tomorrow = day() + Duration::days(1);
  app
    .tasks()
    .create(owner, tomorrow, new_task("kept", Uuid::new_v4()), app.now())
    .await
    .unwrap();

  app.tasks().remove(owner, ids[0]).await.unwrap();
  assert!(app.tasks().list(owner, day()).await.unwrap().is_empty());
  assert_eq!(app.tasks().list(owner, tomorrow).await.unwrap().len(), 1);
}

#[tokio::test]
async fn removing_missing_task_is_a_noop() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 2).await;

  let result = app.tasks().remove(owner, Uuid::new_v4()).await.unwrap();
  assert!(result.applied.is_empty());
  assert_eq!(task_order(&app, owner).await, ids);
}

#[tokio::test]
async fn other_owners_cannot_touch_tasks() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 2).await;

  app.tasks().remove(Uuid::new_v4(), ids[1]).await.unwrap();
  assert_eq!(task_order(&app, owner).await, ids);
}

#[tokio::test]
async fn promote_shifts_only_the_prefix() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 4).await;

  let result = app.tasks().promote(owner, ids[2]).await.unwrap();
  assert!(result.is_complete());
  assert_eq!(result.applied.len(), 3);
  assert_eq!(task_order(&app, owner).await, vec![ids[2], ids[0], ids[1], ids[3]]);
}

#[tokio::test]
async fn promoting_the_primary_writes_nothing() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 3).await;

  let result = app.tasks().promote(owner, ids[0]).await.unwrap();
  assert!(result.applied.is_empty());
  assert_eq!(task_order(&app, owner).await, ids);
}

#[tokio::test]
async fn reorder_applies_permutation() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 4).await;
  let order = vec![ids[3], ids[1], ids[0], ids[2]];

  let result = app.tasks().reorder(owner, day(), &order).await.unwrap();
  assert!(result.is_complete());
  // ids[1] keeps position 1.
  assert_eq!(result.applied.len(), 3);
  assert_eq!(task_order(&app, owner).await, order);
}

#[tokio::test]
async fn invalid_reorder_leaves_positions_untouched() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 3).await;

  for bad in [
    vec![ids[0], ids[1]],
    vec![ids[0], ids[1], ids[1]],
    vec![ids[0], ids[1], Uuid::new_v4()],
  ] {
    let err = app.tasks().reorder(owner, day(), &bad).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidReorderSet(_)));
  }
  assert_eq!(task_order(&app, owner).await, ids);
}

#[tokio::test]
async fn toggle_complete_stamps_and_clears() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 1).await;

  let done = app.tasks().toggle_complete(owner, ids[0], app.now()).await.unwrap();
  let ItemBody::Task(task) = &done.body else { panic!("expected a task") };
  assert!(task.is_completed);
  assert_eq!(task.completed_at, Some(start()));

  let undone = app.tasks().toggle_complete(owner, ids[0], app.now()).await.unwrap();
  let ItemBody::Task(task) = &undone.body else { panic!("expected a task") };
  assert!(!task.is_completed);
  assert_eq!(task.completed_at, None);

  let stored = app.store().get_item(ids[0]).await.unwrap().unwrap();
  assert_eq!(stored, undone);
}

#[tokio::test]
async fn edit_keeps_position() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 2).await;
  let goal = Uuid::new_v4();

  let edit = ItemEdit { title: Some("renamed".into()), goal_id: Some(Some(goal)), ..ItemEdit::default() };
  let item = app.tasks().edit(owner, ids[1], &edit).await.unwrap();
  assert_eq!(item.position, 1);
  assert_eq!(item.body.title(), "renamed");
  assert_eq!(item.body.goal_id(), Some(goal));

  let err = app.tasks().edit(owner, Uuid::new_v4(), &edit).await.unwrap_err();
  assert!(matches!(err, CoreError::NotFound(_)));
}

// ─── Goals ───────────────────────────────────────────────────────────────────

async fn seed_goals(app: &App, owner: Uuid, n: usize) -> Vec<Uuid> {
  let p = Uuid::new_v4();
  let mut ids = Vec::new();
  for i in 0..n {
    let goal = app
      .goals()
      .create(owner, new_goal(&format!("goal {i}"), p), app.now())
      .await
      .unwrap();
    ids.push(goal.item_id);
  }
  ids
}

async fn goal_order(app: &App, owner: Uuid) -> Vec<Uuid> {
  dense_ids(&app.goals().list_active(owner).await.unwrap())
}

#[tokio::test]
async fn sixth_active_goal_exceeds_capacity() {
  let app = app().await;
  let owner = Uuid::new_v4();
  seed_goals(&app, owner, 5).await;

  let err = app
    .goals()
    .create(owner, new_goal("sixth", Uuid::new_v4()), app.now())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::CapacityExceeded { kind: ItemKind::Goal, max: 5 }));
}

#[tokio::test]
async fn deactivate_and_reactivate_goal() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_goals(&app, owner, 3).await;

  let result = app.goals().deactivate(owner, ids[0]).await.unwrap();
  assert!(result.is_complete());
  assert_eq!(goal_order(&app, owner).await, vec![ids[1], ids[2]]);
  assert_eq!(app.goals().list(owner).await.unwrap().len(), 3);

  let goal = app.goals().activate(owner, ids[0]).await.unwrap();
  assert_eq!(goal.position, 2);
  assert_eq!(goal_order(&app, owner).await, vec![ids[1], ids[2], ids[0]]);
}

#[tokio::test]
async fn activating_into_a_full_scope_fails() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_goals(&app, owner, 5).await;
  app.goals().deactivate(owner, ids[4]).await.unwrap();
  app
    .goals()
    .create(owner, new_goal("replacement", Uuid::new_v4()), app.now())
    .await
    .unwrap();

  let err = app.goals().activate(owner, ids[4]).await.unwrap_err();
  assert!(matches!(err, CoreError::CapacityExceeded { .. }));
}

#[tokio::test]
async fn achieved_goal_is_terminal() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_goals(&app, owner, 2).await;

  app.goals().achieve(owner, ids[0], app.now()).await.unwrap();
  assert_eq!(goal_order(&app, owner).await, vec![ids[1]]);

  let stored = app.store().get_item(ids[0]).await.unwrap().unwrap();
  let ItemBody::Goal(goal) = stored.body else { panic!("expected a goal") };
  assert_eq!(goal.status, GoalStatus::Achieved);
  assert_eq!(goal.achieved_at, Some(start()));

  let err = app.goals().activate(owner, ids[0]).await.unwrap_err();
  assert!(matches!(
    err,
    CoreError::InvalidTransition { from: GoalStatus::Achieved, to: GoalStatus::Active }
  ));
  let err = app.goals().deactivate(owner, ids[0]).await.unwrap_err();
  assert!(matches!(err, CoreError::InvalidTransition { .. }));
}

#[tokio::test]
async fn goal_reorder_and_action_count() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_goals(&app, owner, 3).await;

  app.goals().reorder(owner, &[ids[2], ids[0], ids[1]]).await.unwrap();
  assert_eq!(goal_order(&app, owner).await, vec![ids[2], ids[0], ids[1]]);

  let p = Uuid::new_v4();
  for title in ["a", "b"] {
    let input = NewTask { title: title.into(), principle_id: p, goal_id: Some(ids[2]) };
    app.tasks().create(owner, day(), input, app.now()).await.unwrap();
  }
  assert_eq!(app.goals().action_count(owner, ids[2]).await.unwrap(), 2);
  assert_eq!(app.goals().action_count(owner, ids[0]).await.unwrap(), 0);
}

// ─── Principles ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn principle_in_use_cannot_be_removed() {
  let app = app().await;
  let owner = Uuid::nil();
  let honesty = principle(&app, "Honesty").await;
  let courage = principle(&app, "Courage").await;
  app
    .goals()
    .create(owner, new_goal("speak up", courage), app.now())
    .await
    .unwrap();

  let err = app.principles().remove(owner, courage).await.unwrap_err();
  assert!(matches!(err, CoreError::PrincipleInUse(id) if id == courage));

  app.principles().remove(owner, honesty).await.unwrap();
  let left = dense_ids(&app.principles().list(owner).await.unwrap());
  assert_eq!(left, vec![courage]);
}

#[tokio::test]
async fn principles_are_unbounded_and_promotable() {
  let app = app().await;
  let owner = Uuid::nil();
  let mut ids = Vec::new();
  for i in 0..8 {
    ids.push(principle(&app, &format!("p{i}")).await);
  }

  app.principles().promote(owner, ids[7]).await.unwrap();
  let order = dense_ids(&app.principles().list(owner).await.unwrap());
  assert_eq!(order[0], ids[7]);
  assert_eq!(&order[1..], &ids[..7]);
}

// ─── Entitlements ────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_record_is_expired() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let status = app.entitlements().check_status(owner, app.now()).await.unwrap();
  assert_eq!(status, SubscriptionStatus::Expired);
  assert_eq!(app.gate().check(owner, app.now()).await.unwrap(), Access::Denied(status));
}

#[tokio::test]
async fn ensure_record_does_not_overwrite() {
  let app = app().await;
  let owner = Uuid::new_v4();

  let record = app.entitlements().ensure_record(owner).await.unwrap();
  assert_eq!(record, EntitlementRecord::expired(owner));

  app.entitlements().grant_trial(owner, app.now()).await.unwrap();
  let record = app.entitlements().ensure_record(owner).await.unwrap();
  assert_eq!(record.status, SubscriptionStatus::Trial);
}

#[tokio::test]
async fn trial_lapses_after_seven_days() {
  let app = app().await;
  let owner = Uuid::new_v4();
  app.entitlements().grant_trial(owner, app.now()).await.unwrap();

  app.clock().advance(Duration::days(6));
  assert_eq!(
    app.entitlements().check_status(owner, app.now()).await.unwrap(),
    SubscriptionStatus::Trial
  );
  assert!(app.gate().check(owner, app.now()).await.unwrap().is_granted());

  app.clock().advance(Duration::days(2));
  assert_eq!(
    app.entitlements().check_status(owner, app.now()).await.unwrap(),
    SubscriptionStatus::Expired
  );

  // The stored status is never rewritten by a read.
  let view = app.entitlements().describe(owner, app.now()).await.unwrap();
  assert_eq!(view.stored, SubscriptionStatus::Trial);
  assert_eq!(view.effective, SubscriptionStatus::Expired);
  assert_eq!(view.trial_ends_at, Some(start() + Duration::days(7)));
}

#[tokio::test]
async fn regranting_trial_resets_anchor() {
  let app = app().await;
  let owner = Uuid::new_v4();
  app.entitlements().grant_trial(owner, app.now()).await.unwrap();
  app.clock().advance(Duration::days(10));
  app.entitlements().grant_trial(owner, app.now()).await.unwrap();

  assert_eq!(
    app.entitlements().check_status(owner, app.now()).await.unwrap(),
    SubscriptionStatus::Trial
  );
}

#[tokio::test]
async fn active_subscription_never_lapses() {
  let app = app().await;
  let owner = Uuid::new_v4();
  app.entitlements().grant_trial(owner, app.now()).await.unwrap();
  let record = app.entitlements().grant_active(owner).await.unwrap();
  assert_eq!(record.trial_anchor, Some(start()));

  app.clock().advance(Duration::days(365));
  assert_eq!(
    app.gate().check(owner, app.now()).await.unwrap(),
    Access::Granted(SubscriptionStatus::Active)
  );
}

// ─── Habits ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn completion_rate_counts_inclusive_days() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let habit = HabitRef::System(app.store().add_system_habit("Meditate".into()).await.unwrap().habit_id);

  // Added two days before the clock's current day: three days in the window.
  let added = start() - Duration::days(2);
  app.habits().select_habits(owner, &[habit], added).await.unwrap();
  app.habits().toggle_completion(owner, habit, day() - Duration::days(2), added).await.unwrap();
  app.habits().toggle_completion(owner, habit, day(), app.now()).await.unwrap();

  let rate = app
    .habits()
    .completion_rate(owner, habit, DateRange::AllTime, app.today())
    .await
    .unwrap();
  assert_eq!((rate.completed_days, rate.total_days), (2, 3));
  assert!((rate.rate - 2.0 / 3.0).abs() < f64::EPSILON);

  // A range reaching back before the habit was added is clamped.
  let range = DateRange::Between { start: day() - Duration::days(30), end: day() };
  let clamped = app.habits().completion_rate(owner, habit, range, app.today()).await.unwrap();
  assert_eq!(clamped, rate);
}

#[tokio::test]
async fn completion_rate_of_unselected_habit_is_not_found() {
  let app = app().await;
  let err = app
    .habits()
    .completion_rate(Uuid::new_v4(), HabitRef::System(Uuid::new_v4()), DateRange::AllTime, day())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn toggling_twice_leaves_day_incomplete() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let habit = HabitRef::Custom(Uuid::new_v4());

  let first = app.habits().toggle_completion(owner, habit, day(), app.now()).await.unwrap();
  assert!(first.is_completed);
  assert_eq!(first.completed_at, Some(start()));

  let second = app.habits().toggle_completion(owner, habit, day(), app.now()).await.unwrap();
  assert!(!second.is_completed);
  assert_eq!(second.completed_at, None);

  let stored = app.store().get_completion(owner, habit, day()).await.unwrap().unwrap();
  assert_eq!(stored, second);
}

#[tokio::test]
async fn reselecting_keeps_added_at() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let a = HabitRef::System(Uuid::new_v4());
  let b = HabitRef::Custom(Uuid::new_v4());

  app.habits().select_habits(owner, &[a], start()).await.unwrap();
  let later = start() + Duration::days(3);
  let selection = app.habits().select_habits(owner, &[a, b, b], later).await.unwrap();

  assert_eq!(selection.len(), 2);
  assert_eq!(selection[0], SelectedHabit { owner_id: owner, habit: a, added_at: start() });
  assert_eq!(selection[1].added_at, later);
  assert_eq!(app.habits().selected(owner).await.unwrap(), selection);

  app.habits().select_habits(owner, &[b], later).await.unwrap();
  assert_eq!(app.habits().selected(owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn custom_habit_lifecycle() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let habit = app
    .habits()
    .create_custom_habit(owner, "Stretch".into(), app.now())
    .await
    .unwrap();
  let href = HabitRef::Custom(habit.habit_id);
  app.habits().select_habits(owner, &[href], app.now()).await.unwrap();

  app.habits().rename_custom_habit(owner, habit.habit_id, "Stretch daily".into()).await.unwrap();
  let days = app.habits().day_view(owner, day()).await.unwrap();
  assert_eq!(days.len(), 1);
  assert_eq!(days[0].title, "Stretch daily");
  assert!(!days[0].is_completed);

  let err = app
    .habits()
    .rename_custom_habit(Uuid::new_v4(), habit.habit_id, "nope".into())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::NotFound(_)));

  app.habits().delete_custom_habit(owner, habit.habit_id).await.unwrap();
  assert!(app.habits().custom_habits(owner).await.unwrap().is_empty());
  assert!(app.habits().selected(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn system_habits_seed_idempotently() {
  let s = store().await;
  let first = s.add_system_habit("Read".into()).await.unwrap();
  let again = s.add_system_habit("Read".into()).await.unwrap();
  s.add_system_habit("Exercise".into()).await.unwrap();

  assert_eq!(first, again);
  let titles: Vec<String> = s.list_system_habits().await.unwrap().into_iter().map(|h| h.title).collect();
  assert_eq!(titles, vec!["Exercise", "Read"]);
}

#[tokio::test]
async fn weekly_progress_marks_each_day() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let habit = HabitRef::System(Uuid::new_v4());
  let week_start = day() - Duration::days(6);
  app.habits().select_habits(owner, &[habit], start() - Duration::days(30)).await.unwrap();
  app.habits().toggle_completion(owner, habit, week_start, app.now()).await.unwrap();
  app.habits().toggle_completion(owner, habit, day(), app.now()).await.unwrap();

  let week = app.habits().weekly_progress(owner, week_start, day()).await.unwrap();
  assert_eq!(week.len(), 1);
  assert_eq!(week[0].title, "Unknown");
  assert_eq!(week[0].days.len(), 7);
  assert_eq!(week[0].days.values().filter(|d| **d).count(), 2);
  assert_eq!((week[0].rate.completed_days, week[0].rate.total_days), (2, 7));
}

#[tokio::test]
async fn weekly_rate_stops_at_today() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let habit = HabitRef::System(Uuid::new_v4());
  let week_start = day() - Duration::days(2);
  app.habits().select_habits(owner, &[habit], start() - Duration::days(30)).await.unwrap();
  app.habits().toggle_completion(owner, habit, week_start, app.now()).await.unwrap();
  app.habits().toggle_completion(owner, habit, day(), app.now()).await.unwrap();

  let week = app.habits().weekly_progress(owner, week_start, day()).await.unwrap();
  assert_eq!(week[0].days.len(), 7);
  assert_eq!((week[0].rate.completed_days, week[0].rate.total_days), (2, 3));

  // A week that has not started yet has no days to rate.
  let ahead = app.habits().weekly_progress(owner, day() + Duration::days(1), day()).await.unwrap();
  assert_eq!((ahead[0].rate.completed_days, ahead[0].rate.total_days), (0, 0));
}

// ─── Progress ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn task_progress_names_most_focused_principle() {
  let app = app().await;
  let owner = Uuid::nil();
  let focus = principle(&app, "Focus").await;
  let rest = principle(&app, "Rest").await;

  let mut ids = Vec::new();
  for (title, p) in [("a", focus), ("b", focus), ("c", rest)] {
    let task = app.tasks().create(owner, day(), new_task(title, p), app.now()).await.unwrap();
    ids.push(task.item_id);
  }
  for id in &ids[..2] {
    app.tasks().toggle_complete(owner, *id, app.now()).await.unwrap();
  }

  let progress = app.progress().task_progress(owner, DateRange::AllTime).await.unwrap();
  assert_eq!(progress.total_tasks, 3);
  assert_eq!(progress.completed_tasks, 2);
  let focused = progress.most_focused.unwrap();
  assert_eq!(focused.principle_id, focus);
  assert_eq!(focused.title, "Focus");
  assert_eq!(focused.count, 2);

  let range = DateRange::Between { start: day() + Duration::days(1), end: day() + Duration::days(2) };
  let empty = app.progress().task_progress(owner, range).await.unwrap();
  assert_eq!(empty.total_tasks, 0);
}

// ─── Sequences ───────────────────────────────────────────────────────────────

async fn principle_order(app: &App) -> Vec<Uuid> {
  dense_ids(&app.principles().list(Uuid::nil()).await.unwrap())
}

#[tokio::test]
async fn goal_scope_stays_dense_through_mixed_operations() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_goals(&app, owner, 5).await;

  app.goals().remove(owner, ids[1]).await.unwrap();
  assert_eq!(goal_order(&app, owner).await, vec![ids[0], ids[2], ids[3], ids[4]]);

  app.goals().deactivate(owner, ids[3]).await.unwrap();
  assert_eq!(goal_order(&app, owner).await, vec![ids[0], ids[2], ids[4]]);

  let new = app
    .goals()
    .create(owner, new_goal("new", Uuid::new_v4()), app.now())
    .await
    .unwrap()
    .item_id;
  assert_eq!(goal_order(&app, owner).await, vec![ids[0], ids[2], ids[4], new]);

  app.goals().remove(owner, ids[0]).await.unwrap();
  assert_eq!(goal_order(&app, owner).await, vec![ids[2], ids[4], new]);

  app.goals().activate(owner, ids[3]).await.unwrap();
  assert_eq!(goal_order(&app, owner).await, vec![ids[2], ids[4], new, ids[3]]);

  let result = app.goals().remove(owner, ids[3]).await.unwrap();
  assert!(result.is_complete());
  assert_eq!(goal_order(&app, owner).await, vec![ids[2], ids[4], new]);
  assert_eq!(app.goals().list(owner).await.unwrap().len(), 3);
}

#[tokio::test]
async fn principle_list_stays_dense_through_mixed_operations() {
  let app = app().await;
  let owner = Uuid::nil();
  let a = principle(&app, "a").await;
  let b = principle(&app, "b").await;
  let c = principle(&app, "c").await;

  app.principles().remove(owner, b).await.unwrap();
  assert_eq!(principle_order(&app).await, vec![a, c]);

  let d = principle(&app, "d").await;
  assert_eq!(principle_order(&app).await, vec![a, c, d]);

  app.principles().promote(owner, d).await.unwrap();
  assert_eq!(principle_order(&app).await, vec![d, a, c]);

  // Principles have no primary; removing the head only closes the gap.
  app.principles().remove(owner, d).await.unwrap();
  assert_eq!(principle_order(&app).await, vec![a, c]);

  app.principles().promote(owner, c).await.unwrap();
  assert_eq!(principle_order(&app).await, vec![c, a]);
}

#[tokio::test]
async fn task_day_stays_dense_through_mixed_operations() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 4).await;
  let p = Uuid::new_v4();

  app.tasks().remove(owner, ids[2]).await.unwrap();
  assert_eq!(task_order(&app, owner).await, vec![ids[0], ids[1], ids[3]]);

  let extra = app.tasks().create(owner, day(), new_task("extra", p), app.now()).await.unwrap().item_id;
  assert_eq!(task_order(&app, owner).await, vec![ids[0], ids[1], ids[3], extra]);

  app.tasks().promote(owner, extra).await.unwrap();
  assert_eq!(task_order(&app, owner).await, vec![extra, ids[0], ids[1], ids[3]]);

  app.tasks().remove(owner, ids[1]).await.unwrap();
  assert_eq!(task_order(&app, owner).await, vec![extra, ids[0], ids[3]]);

  app.tasks().remove(owner, extra).await.unwrap();
  assert!(task_order(&app, owner).await.is_empty());

  let fresh = app.tasks().create(owner, day(), new_task("fresh", p), app.now()).await.unwrap();
  assert_eq!(fresh.position, 0);
  assert_eq!(task_order(&app, owner).await, vec![fresh.item_id]);
}

/// One step of a generated operation sequence. Indices select from every id
/// the sequence has created so far, removed ones included.
#[derive(Debug, Clone)]
enum Op {
  Create,
  Remove(usize),
  Promote(usize),
  Deactivate(usize),
  Activate(usize),
}

fn goal_op() -> impl Strategy<Value = Op> {
  prop_oneof![
    3 => Just(Op::Create),
    2 => (0..16usize).prop_map(Op::Remove),
    2 => (0..16usize).prop_map(Op::Deactivate),
    2 => (0..16usize).prop_map(Op::Activate),
  ]
}

fn list_op() -> impl Strategy<Value = Op> {
  prop_oneof![
    3 => Just(Op::Create),
    2 => (0..16usize).prop_map(Op::Remove),
    2 => (0..16usize).prop_map(Op::Promote),
  ]
}

/// The order a collection must hold after each step.
#[derive(Default)]
struct Model {
  known:    Vec<Uuid>,
  active:   Vec<Uuid>,
  inactive: Vec<Uuid>,
}

impl Model {
  fn pick(&self, n: usize) -> Option<Uuid> {
    (!self.known.is_empty()).then(|| self.known[n % self.known.len()])
  }

  fn add(&mut self, id: Uuid) {
    self.known.push(id);
    self.active.push(id);
  }

  fn forget(&mut self, id: Uuid) {
    self.active.retain(|a| *a != id);
    self.inactive.retain(|a| *a != id);
  }

  fn promote(&mut self, id: Uuid) {
    if let Some(at) = self.active.iter().position(|a| *a == id) {
      let id = self.active.remove(at);
      self.active.insert(0, id);
    }
  }

  fn check(&self, listed: &[Item]) -> Result<(), TestCaseError> {
    for (expected, item) in (0u32..).zip(listed) {
      prop_assert_eq!(item.position, expected);
    }
    let order: Vec<Uuid> = listed.iter().map(|i| i.item_id).collect();
    prop_assert_eq!(&order, &self.active);
    Ok(())
  }
}

fn expect_capacity(err: CoreError) -> Result<(), TestCaseError> {
  prop_assert!(matches!(err, CoreError::CapacityExceeded { .. }), "unexpected {err}");
  Ok(())
}

async fn run_goal_ops(ops: Vec<Op>) -> Result<(), TestCaseError> {
  let app = app().await;
  let owner = Uuid::new_v4();
  let mut model = Model::default();

  for op in ops {
    match op {
      Op::Create => {
        match app.goals().create(owner, new_goal("g", Uuid::new_v4()), app.now()).await {
          Ok(goal) => {
            prop_assert!(model.active.len() < 5);
            model.add(goal.item_id);
          }
          Err(err) => {
            prop_assert_eq!(model.active.len(), 5);
            expect_capacity(err)?;
          }
        }
      }
      Op::Remove(n) => {
        let Some(id) = model.pick(n) else { continue };
        prop_assert!(app.goals().remove(owner, id).await.unwrap().is_complete());
        model.forget(id);
      }
      Op::Deactivate(n) => {
        let Some(id) = model.pick(n) else { continue };
        prop_assert!(app.goals().deactivate(owner, id).await.unwrap().is_complete());
        if model.active.contains(&id) {
          model.forget(id);
          model.inactive.push(id);
        }
      }
      Op::Activate(n) => {
        let Some(id) = model.pick(n) else { continue };
        let result = app.goals().activate(owner, id).await;
        if model.active.contains(&id) {
          prop_assert!(result.is_ok());
        } else if model.inactive.contains(&id) {
          if model.active.len() < 5 {
            prop_assert_eq!(result.unwrap().position as usize, model.active.len());
            model.forget(id);
            model.active.push(id);
          } else {
            expect_capacity(result.unwrap_err())?;
          }
        } else {
          prop_assert!(matches!(result, Err(CoreError::NotFound(_))));
        }
      }
      Op::Promote(_) => unreachable!("goals are not promoted"),
    }

    model.check(&app.goals().list_active(owner).await.unwrap())?;
    let all = app.goals().list(owner).await.unwrap();
    prop_assert_eq!(all.len(), model.active.len() + model.inactive.len());
  }
  Ok(())
}

async fn run_task_ops(ops: Vec<Op>) -> Result<(), TestCaseError> {
  let app = app().await;
  let owner = Uuid::new_v4();
  let p = Uuid::new_v4();
  let mut model = Model::default();

  for op in ops {
    match op {
      Op::Create => match app.tasks().create(owner, day(), new_task("t", p), app.now()).await {
        Ok(task) => {
          prop_assert!(model.active.len() < 4);
          model.add(task.item_id);
        }
        Err(err) => {
          prop_assert_eq!(model.active.len(), 4);
          expect_capacity(err)?;
        }
      },
      Op::Remove(n) => {
        let Some(id) = model.pick(n) else { continue };
        prop_assert!(app.tasks().remove(owner, id).await.unwrap().is_complete());
        if model.active.first() == Some(&id) {
          model.active.clear();
        } else {
          model.forget(id);
        }
      }
      Op::Promote(n) => {
        let Some(id) = model.pick(n) else { continue };
        prop_assert!(app.tasks().promote(owner, id).await.unwrap().is_complete());
        model.promote(id);
      }
      Op::Deactivate(_) | Op::Activate(_) => unreachable!("tasks have no status scope"),
    }

    model.check(&app.tasks().list(owner, day()).await.unwrap())?;
  }
  Ok(())
}

async fn run_principle_ops(ops: Vec<Op>) -> Result<(), TestCaseError> {
  let app = app().await;
  let owner = Uuid::nil();
  let mut model = Model::default();

  for op in ops {
    match op {
      Op::Create => model.add(principle(&app, "p").await),
      Op::Remove(n) => {
        let Some(id) = model.pick(n) else { continue };
        prop_assert!(app.principles().remove(owner, id).await.unwrap().is_complete());
        model.forget(id);
      }
      Op::Promote(n) => {
        let Some(id) = model.pick(n) else { continue };
        prop_assert!(app.principles().promote(owner, id).await.unwrap().is_complete());
        model.promote(id);
      }
      Op::Deactivate(_) | Op::Activate(_) => unreachable!("principles have no status scope"),
    }

    model.check(&app.principles().list(owner).await.unwrap())?;
  }
  Ok(())
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(48))]

  #[test]
  fn goal_positions_follow_the_model(ops in prop::collection::vec(goal_op(), 1..40)) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(run_goal_ops(ops))?;
  }

  #[test]
  fn task_positions_follow_the_model(ops in prop::collection::vec(list_op(), 1..40)) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(run_task_ops(ops))?;
  }

  #[test]
  fn principle_positions_follow_the_model(ops in prop::collection::vec(list_op(), 1..40)) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(run_principle_ops(ops))?;
  }
}

// ─── Partial batches ─────────────────────────────────────────────────────────

/// Delegates to a real store but fails every `update_item` after the first
/// `updates_left`, the way a dropped connection would.
struct FlakyStore {
  inner:        SqliteStore,
  updates_left: AtomicUsize,
}

impl FlakyStore {
  fn new(inner: SqliteStore, updates: usize) -> Self {
    Self { inner, updates_left: AtomicUsize::new(updates) }
  }
}

impl RecordStore for FlakyStore {
  type Error = Error;

  async fn create_item(&self, input: NewItem) -> Result<Item, Error> {
    self.inner.create_item(input).await
  }

  async fn get_item(&self, id: Uuid) -> Result<Option<Item>, Error> { self.inner.get_item(id).await }

  async fn query_items(&self, query: &ItemQuery) -> Result<Vec<Item>, Error> {
    self.inner.query_items(query).await
  }

  async fn count_items(&self, query: &ItemQuery) -> Result<u64, Error> {
    self.inner.count_items(query).await
  }

  async fn update_item(&self, id: Uuid, patch: ItemPatch) -> Result<bool, Error> {
    let allowed = self
      .updates_left
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if !allowed {
      return Err(Error::Timeout(std::time::Duration::from_millis(1)));
    }
    self.inner.update_item(id, patch).await
  }

  async fn delete_item(&self, id: Uuid) -> Result<bool, Error> { self.inner.delete_item(id).await }

  async fn delete_items(&self, query: &ItemQuery) -> Result<u64, Error> {
    self.inner.delete_items(query).await
  }

  async fn get_entitlement(&self, owner_id: Uuid) -> Result<Option<EntitlementRecord>, Error> {
    self.inner.get_entitlement(owner_id).await
  }

  async fn put_entitlement(&self, record: EntitlementRecord) -> Result<(), Error> {
    self.inner.put_entitlement(record).await
  }

  async fn insert_entitlement_if_absent(&self, record: EntitlementRecord) -> Result<bool, Error> {
    self.inner.insert_entitlement_if_absent(record).await
  }

  async fn add_system_habit(&self, title: String) -> Result<SystemHabit, Error> {
    self.inner.add_system_habit(title).await
  }

  async fn list_system_habits(&self) -> Result<Vec<SystemHabit>, Error> {
    self.inner.list_system_habits().await
  }

  async fn create_custom_habit(
    &self,
    owner_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
  ) -> Result<CustomHabit, Error> {
    self.inner.create_custom_habit(owner_id, title, created_at).await
  }

  async fn list_custom_habits(&self, owner_id: Uuid) -> Result<Vec<CustomHabit>, Error> {
    self.inner.list_custom_habits(owner_id).await
  }

  async fn rename_custom_habit(
    &self,
    owner_id: Uuid,
    habit_id: Uuid,
    title: String,
  ) -> Result<bool, Error> {
    self.inner.rename_custom_habit(owner_id, habit_id, title).await
  }

  async fn delete_custom_habit(&self, owner_id: Uuid, habit_id: Uuid) -> Result<bool, Error> {
    self.inner.delete_custom_habit(owner_id, habit_id).await
  }

  async fn habit_title(&self, habit: HabitRef) -> Result<Option<String>, Error> {
    self.inner.habit_title(habit).await
  }

  async fn list_selected_habits(&self, owner_id: Uuid) -> Result<Vec<SelectedHabit>, Error> {
    self.inner.list_selected_habits(owner_id).await
  }

  async fn replace_selected_habits(
    &self,
    owner_id: Uuid,
    selection: Vec<SelectedHabit>,
  ) -> Result<(), Error> {
    self.inner.replace_selected_habits(owner_id, selection).await
  }

  async fn remove_selected_habit(&self, owner_id: Uuid, habit: HabitRef) -> Result<(), Error> {
    self.inner.remove_selected_habit(owner_id, habit).await
  }

  async fn get_completion(
    &self,
    owner_id: Uuid,
    habit: HabitRef,
    date: NaiveDate,
  ) -> Result<Option<HabitCompletion>, Error> {
    self.inner.get_completion(owner_id, habit, date).await
  }

  async fn put_completion(&self, completion: HabitCompletion) -> Result<(), Error> {
    self.inner.put_completion(completion).await
  }

  async fn list_completions(
    &self,
    owner_id: Uuid,
    habit: Option<HabitRef>,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<HabitCompletion>, Error> {
    self.inner.list_completions(owner_id, habit, from, to).await
  }
}

#[tokio::test]
async fn interrupted_reorder_reports_progress_and_repairs() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 4).await;
  let order = vec![ids[3], ids[2], ids[1], ids[0]];

  let flaky = FlakyStore::new(app.store().clone(), 2);
  let result = Tasks::new(&flaky).reorder(owner, day(), &order).await.unwrap();

  assert!(!result.is_complete());
  assert_eq!(result.applied.len(), 2);
  let failed = result.failed.as_ref().unwrap();
  assert_eq!(failed.write.item_id, ids[1]);
  assert!(failed.error.is_transient());
  assert_eq!(result.pending.len(), 1);
  assert_eq!(result.pending[0].item_id, ids[0]);

  // Re-issuing the same order against a healthy store restores density.
  let repair = app.tasks().reorder(owner, day(), &order).await.unwrap();
  assert!(repair.is_complete());
  assert_eq!(task_order(&app, owner).await, order);
}

#[tokio::test]
async fn interrupted_gap_close_is_reported() {
  let app = app().await;
  let owner = Uuid::new_v4();
  let ids = seed_tasks(&app, owner, 4).await;

  let flaky = FlakyStore::new(app.store().clone(), 0);
  let result = Tasks::new(&flaky).remove(owner, ids[1]).await.unwrap();
  assert!(!result.is_complete());
  assert!(result.applied.is_empty());
  assert_eq!(result.pending.len(), 1);
  assert!(matches!(result.into_result(), Err(CoreError::TransientStoreFailure(_))));
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn timeouts_are_transient() {
  let err = Error::Timeout(std::time::Duration::from_secs(1));
  assert!(err.is_transient());
  assert!(CoreError::store(err).is_transient());

  let err = Error::DateParse("garbage".into());
  assert!(!err.is_transient());
  assert!(matches!(CoreError::store(err), CoreError::Store(_)));
}
