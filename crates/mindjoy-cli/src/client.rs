//! Async HTTP client wrapping the Mindjoy JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use mindjoy_core::{
  entitlement::{EntitlementRecord, EntitlementView},
  gate::Access,
  habit::{CompletionRate, CustomHabit, HabitCompletion, HabitRef, SelectedHabit},
  item::Item,
  ledger::{HabitDay, WeeklyHabitProgress},
  planner::PositionWrite,
  progress::TaskProgress,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use uuid::Uuid;

/// Connection settings for the Mindjoy API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub owner_id: Uuid,
}

/// Positions written by an ordering call.
#[derive(Debug, Deserialize)]
pub struct Applied {
  pub applied: Vec<PositionWrite>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for one owner's slice of the API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/owners/{}{}",
      self.config.base_url.trim_end_matches('/'),
      self.config.owner_id,
      path
    )
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self.client.request(method, self.url(path))
  }

  /// Send `req` and decode a JSON body, surfacing the API's error message on
  /// a non-2xx status.
  async fn fetch<T: DeserializeOwned>(&self, label: &str, req: RequestBuilder) -> Result<T> {
    let resp = req.send().await.with_context(|| format!("{label} failed"))?;
    let resp = check(label, resp).await?;
    resp.json().await.with_context(|| format!("deserialising {label}"))
  }

  /// Send `req` for an endpoint that answers with an empty body.
  async fn send(&self, label: &str, req: RequestBuilder) -> Result<()> {
    let resp = req.send().await.with_context(|| format!("{label} failed"))?;
    check(label, resp).await?;
    Ok(())
  }

  // ── Entitlement ───────────────────────────────────────────────────────────

  pub async fn entitlement(&self) -> Result<EntitlementView> {
    self.fetch("GET /entitlement", self.request(Method::GET, "/entitlement")).await
  }

  pub async fn access(&self) -> Result<Access> {
    self.fetch("GET /access", self.request(Method::GET, "/access")).await
  }

  pub async fn start_trial(&self) -> Result<EntitlementRecord> {
    self
      .fetch("POST /entitlement/trial", self.request(Method::POST, "/entitlement/trial"))
      .await
  }

  pub async fn subscribe(&self) -> Result<EntitlementRecord> {
    self
      .fetch("POST /entitlement/active", self.request(Method::POST, "/entitlement/active"))
      .await
  }

  // ── Positioned items ──────────────────────────────────────────────────────

  pub async fn tasks(&self, date: NaiveDate) -> Result<Vec<Item>> {
    let path = format!("/days/{date}/tasks");
    self.fetch("GET tasks", self.request(Method::GET, &path)).await
  }

  pub async fn add_task(
    &self,
    date: NaiveDate,
    title: &str,
    principle_id: Uuid,
    goal_id: Option<Uuid>,
  ) -> Result<Item> {
    let path = format!("/days/{date}/tasks");
    let body = json!({ "title": title, "principle_id": principle_id, "goal_id": goal_id });
    self.fetch("POST task", self.request(Method::POST, &path).json(&body)).await
  }

  pub async fn order_tasks(&self, date: NaiveDate, ids: &[Uuid]) -> Result<Applied> {
    let path = format!("/days/{date}/tasks/order");
    let req = self.request(Method::PUT, &path).json(&json!({ "ids": ids }));
    self.fetch("PUT task order", req).await
  }

  pub async fn goals(&self, active_only: bool) -> Result<Vec<Item>> {
    let req = self.request(Method::GET, "/goals").query(&[("active", active_only)]);
    self.fetch("GET goals", req).await
  }

  pub async fn add_goal(
    &self,
    title: &str,
    principle_id: Uuid,
    description: Option<&str>,
  ) -> Result<Item> {
    let body = json!({ "title": title, "principle_id": principle_id, "description": description });
    self.fetch("POST goal", self.request(Method::POST, "/goals").json(&body)).await
  }

  pub async fn principles(&self) -> Result<Vec<Item>> {
    self.fetch("GET principles", self.request(Method::GET, "/principles")).await
  }

  pub async fn add_principle(&self, title: &str, description: Option<&str>) -> Result<Item> {
    let body = json!({ "title": title, "description": description });
    self.fetch("POST principle", self.request(Method::POST, "/principles").json(&body)).await
  }

  /// `PUT /{collection}/order` for goals and principles.
  pub async fn order(&self, collection: Collection, ids: &[Uuid]) -> Result<Applied> {
    let path = format!("/{}/order", collection.segment());
    let req = self.request(Method::PUT, &path).json(&json!({ "ids": ids }));
    self.fetch("PUT order", req).await
  }

  /// `POST /{collection}/{id}/{action}` returning the affected positions.
  pub async fn reposition(
    &self,
    collection: Collection,
    id: Uuid,
    action: &str,
  ) -> Result<Applied> {
    let path = format!("/{}/{id}/{action}", collection.segment());
    self.fetch("POST item action", self.request(Method::POST, &path)).await
  }

  /// `POST /{collection}/{id}/{action}` returning the updated item.
  pub async fn update(&self, collection: Collection, id: Uuid, action: &str) -> Result<Item> {
    let path = format!("/{}/{id}/{action}", collection.segment());
    self.fetch("POST item action", self.request(Method::POST, &path)).await
  }

  pub async fn remove(&self, collection: Collection, id: Uuid) -> Result<Applied> {
    let path = format!("/{}/{id}", collection.segment());
    self.fetch("DELETE item", self.request(Method::DELETE, &path)).await
  }

  // ── Habits ────────────────────────────────────────────────────────────────

  pub async fn habit_day(&self, date: NaiveDate) -> Result<Vec<HabitDay>> {
    let path = format!("/habits/day/{date}");
    self.fetch("GET habit day", self.request(Method::GET, &path)).await
  }

  pub async fn habit_week(&self, start: NaiveDate) -> Result<Vec<WeeklyHabitProgress>> {
    let path = format!("/habits/week/{start}");
    self.fetch("GET habit week", self.request(Method::GET, &path)).await
  }

  pub async fn toggle_habit(
    &self,
    habit: HabitRef,
    date: Option<NaiveDate>,
  ) -> Result<HabitCompletion> {
    #[derive(Serialize)]
    struct Body {
      habit: HabitRef,
      #[serde(skip_serializing_if = "Option::is_none")]
      date:  Option<NaiveDate>,
    }
    let req = self.request(Method::POST, "/habits/toggle").json(&Body { habit, date });
    self.fetch("POST habit toggle", req).await
  }

  pub async fn habit_rate(&self, habit: HabitRef) -> Result<CompletionRate> {
    let req = self.request(Method::GET, "/habits/rate").query(&[
      ("habit_type", habit.habit_type().to_string()),
      ("habit_id", habit.id().to_string()),
    ]);
    self.fetch("GET habit rate", req).await
  }

  pub async fn add_custom_habit(&self, title: &str) -> Result<CustomHabit> {
    let req = self.request(Method::POST, "/habits/custom").json(&json!({ "title": title }));
    self.fetch("POST custom habit", req).await
  }

  pub async fn rename_custom_habit(&self, id: Uuid, title: &str) -> Result<()> {
    let path = format!("/habits/custom/{id}");
    let req = self.request(Method::PATCH, &path).json(&json!({ "title": title }));
    self.send("PATCH custom habit", req).await
  }

  pub async fn delete_custom_habit(&self, id: Uuid) -> Result<()> {
    let path = format!("/habits/custom/{id}");
    self.send("DELETE custom habit", self.request(Method::DELETE, &path)).await
  }

  /// Replace the whole selection with `habits`.
  pub async fn select_habits(&self, habits: &[HabitRef]) -> Result<Vec<SelectedHabit>> {
    let req = self.request(Method::PUT, "/habits/selected").json(&json!({ "habits": habits }));
    self.fetch("PUT selected habits", req).await
  }

  // ── Progress ──────────────────────────────────────────────────────────────

  pub async fn progress(&self, range: Option<(NaiveDate, NaiveDate)>) -> Result<TaskProgress> {
    let mut req = self.request(Method::GET, "/progress");
    if let Some((start, end)) = range {
      req = req.query(&[("start", start), ("end", end)]);
    }
    self.fetch("GET progress", req).await
  }
}

/// The owner-scoped collections addressed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
  Tasks,
  Goals,
  Principles,
}

impl Collection {
  fn segment(self) -> &'static str {
    match self {
      Self::Tasks => "tasks",
      Self::Goals => "goals",
      Self::Principles => "principles",
    }
  }
}

async fn check(label: &str, resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let message = match resp.json::<ErrorBody>().await {
    Ok(body) => body.error,
    Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
  };
  Err(anyhow!("{label} → {status}: {message}"))
}
