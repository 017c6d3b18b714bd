//! Stats merger: reconciles the live recomputation with the stats cache
//!
//! Each aggregate is chosen by its own decision table, an ordered list of
//! (source, resolver) rows. The first row whose resolver has signal wins.

use crate::services::directory::{resolve_model, ModelDirectory};
use crate::services::normalizer::provider_display_name;
use crate::services::pricing::{PricingMemo, PricingResolver};
use crate::services::temporal;
use crate::types::{
    parse_cache_date, CacheDay, CacheModelUsage, DataSource, ModelTokenMap, Period, RankingEntry,
    SourceReport, StatsCache, StatsSnapshot, TokenCounts, UsageSummary,
};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;

/// Rankings keep this many entries
pub const TOP_N: usize = 3;

/// Run-scoped collaborators for one merge
pub struct MergeContext<'a> {
    pub period: Period,
    pub now: DateTime<Utc>,
    pub pricing: &'a dyn PricingResolver,
    pub directory: &'a dyn ModelDirectory,
}

/// Raw material every decision table reads from
pub struct MergeInputs<'a> {
    pub period: Period,
    pub live: &'a UsageSummary,
    pub cache: Option<&'a StatsCache>,
}

impl<'a> MergeInputs<'a> {
    fn live_daily(&self) -> BTreeMap<NaiveDate, u64> {
        self.live
            .daily_activity
            .iter()
            .filter(|(d, _)| self.period.contains(**d))
            .map(|(d, c)| (*d, *c))
            .collect()
    }

    fn live_has_activity(&self) -> bool {
        self.live
            .daily_activity
            .keys()
            .any(|d| self.period.contains(*d))
    }

    fn cache_days_in_period(&self) -> impl Iterator<Item = (NaiveDate, &'a CacheDay)> + 'a {
        let period = self.period;
        let cache = self.cache;
        cache
            .into_iter()
            .flat_map(|c| c.daily_activity.iter())
            .filter_map(move |day| {
                day.parsed_date()
                    .filter(|d| period.contains(*d))
                    .map(|d| (d, day))
            })
    }

    fn usage_record(&self, model: &str) -> Option<&CacheModelUsage> {
        self.cache.and_then(|c| c.model_usage.get(model))
    }
}

/// One row of a decision table
pub struct Rule<C, T> {
    pub source: DataSource,
    pub resolve: fn(&C) -> Option<T>,
}

/// Evaluate `rules` in order; the first resolver returning `Some` wins
pub fn decide<C, T>(inputs: &C, rules: &[Rule<C, T>]) -> Option<(DataSource, T)> {
    rules
        .iter()
        .find_map(|rule| (rule.resolve)(inputs).map(|value| (rule.source, value)))
}

// ========== daily activity / messages ==========

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    pub daily: BTreeMap<NaiveDate, u64>,
    pub messages: u64,
}

pub fn activity_rules<'a>() -> [Rule<MergeInputs<'a>, Activity>; 2] {
    [
        Rule { source: DataSource::Live, resolve: live_activity },
        Rule { source: DataSource::CacheDaily, resolve: cache_activity },
    ]
}

fn live_activity(inputs: &MergeInputs<'_>) -> Option<Activity> {
    let daily = inputs.live_daily();
    if daily.is_empty() {
        return None;
    }
    let messages = daily.values().sum();
    Some(Activity { daily, messages })
}

fn cache_activity(inputs: &MergeInputs<'_>) -> Option<Activity> {
    let mut activity = Activity::default();
    let mut any = false;
    for (date, day) in inputs.cache_days_in_period() {
        any = true;
        *activity.daily.entry(date).or_insert(0) += day.message_count;
        activity.messages = activity.messages.saturating_add(day.message_count);
    }
    any.then_some(activity)
}

// ========== sessions / tool calls ==========

/// The last row is a backstop for when the winning source reports zero
pub fn session_rules<'a>() -> [Rule<MergeInputs<'a>, u64>; 3] {
    [
        Rule { source: DataSource::Live, resolve: live_sessions },
        Rule { source: DataSource::CacheDaily, resolve: cache_period_sessions },
        Rule { source: DataSource::CacheAllDays, resolve: cache_all_sessions },
    ]
}

pub fn tool_call_rules<'a>() -> [Rule<MergeInputs<'a>, u64>; 3] {
    [
        Rule { source: DataSource::Live, resolve: live_tool_calls },
        Rule { source: DataSource::CacheDaily, resolve: cache_period_tool_calls },
        Rule { source: DataSource::CacheAllDays, resolve: cache_all_tool_calls },
    ]
}

fn live_sessions(inputs: &MergeInputs<'_>) -> Option<u64> {
    let count = inputs.live.sessions.len() as u64;
    (inputs.live_has_activity() && count > 0).then_some(count)
}

fn cache_period_sessions(inputs: &MergeInputs<'_>) -> Option<u64> {
    if inputs.live_has_activity() {
        return None;
    }
    let sum: u64 = inputs.cache_days_in_period().map(|(_, d)| d.session_count).sum();
    (sum > 0).then_some(sum)
}

/// Sums every cache day, ignoring the period
fn cache_all_sessions(inputs: &MergeInputs<'_>) -> Option<u64> {
    let sum: u64 = inputs
        .cache
        .map(|c| c.daily_activity.iter().map(|d| d.session_count).sum())
        .unwrap_or(0);
    (sum > 0).then_some(sum)
}

fn live_tool_calls(inputs: &MergeInputs<'_>) -> Option<u64> {
    let count = inputs.live.tool_calls;
    (inputs.live_has_activity() && count > 0).then_some(count)
}

fn cache_period_tool_calls(inputs: &MergeInputs<'_>) -> Option<u64> {
    if inputs.live_has_activity() {
        return None;
    }
    let sum: u64 = inputs
        .cache_days_in_period()
        .map(|(_, d)| d.tool_call_count)
        .sum();
    (sum > 0).then_some(sum)
}

fn cache_all_tool_calls(inputs: &MergeInputs<'_>) -> Option<u64> {
    let sum: u64 = inputs
        .cache
        .map(|c| c.daily_activity.iter().map(|d| d.tool_call_count).sum())
        .unwrap_or(0);
    (sum > 0).then_some(sum)
}

// ========== per-model tokens ==========

pub fn model_token_rules<'a>() -> [Rule<MergeInputs<'a>, ModelTokenMap>; 3] {
    [
        Rule { source: DataSource::Live, resolve: live_model_tokens },
        Rule { source: DataSource::CacheDaily, resolve: cache_daily_model_tokens },
        Rule { source: DataSource::CacheModelUsage, resolve: cache_model_usage_tokens },
    ]
}

fn live_model_tokens(inputs: &MergeInputs<'_>) -> Option<ModelTokenMap> {
    (!inputs.live.model_tokens.is_empty()).then(|| inputs.live.model_tokens.clone())
}

fn cache_daily_model_tokens(inputs: &MergeInputs<'_>) -> Option<ModelTokenMap> {
    let cache = inputs.cache?;
    let mut days: Vec<(NaiveDate, &BTreeMap<String, u64>)> = cache
        .daily_model_tokens
        .iter()
        .filter_map(|day| {
            day.parsed_date()
                .filter(|d| inputs.period.contains(*d))
                .map(|d| (d, &day.tokens_by_model))
        })
        .collect();
    days.sort_by_key(|(d, _)| *d);

    let map: ModelTokenMap = days
        .into_iter()
        .flat_map(|(_, models)| models.iter().map(|(m, t)| (m.as_str(), *t)))
        .filter(|(_, t)| *t > 0)
        .collect();
    (!map.is_empty()).then_some(map)
}

/// Crude all-time totals (input + output only)
fn cache_model_usage_tokens(inputs: &MergeInputs<'_>) -> Option<ModelTokenMap> {
    let cache = inputs.cache?;
    let map: ModelTokenMap = cache
        .model_usage
        .iter()
        .map(|(m, u)| (m.as_str(), u.input_tokens.saturating_add(u.output_tokens)))
        .filter(|(_, t)| *t > 0)
        .collect();
    (!map.is_empty()).then_some(map)
}

// ========== token / cost totals ==========

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    pub tokens: TokenCounts,
    pub total_tokens: u64,
    pub cost_usd: f64,
}

/// Inputs for the totals table, which also sees the chosen per-model map
pub struct TotalsInputs<'a> {
    pub live: &'a UsageSummary,
    pub cache: Option<&'a StatsCache>,
    pub model_tokens: &'a ModelTokenMap,
    pub pricing: &'a dyn PricingResolver,
}

pub fn totals_rules<'a>() -> [Rule<TotalsInputs<'a>, Totals>; 2] {
    [
        Rule { source: DataSource::Live, resolve: live_totals },
        Rule { source: DataSource::Apportioned, resolve: apportioned_totals },
    ]
}

fn live_totals(inputs: &TotalsInputs<'_>) -> Option<Totals> {
    inputs.live.has_token_signal().then(|| Totals {
        tokens: inputs.live.tokens,
        total_tokens: inputs.live.total_tokens,
        cost_usd: inputs.live.total_cost_usd,
    })
}

fn apportioned_totals(inputs: &TotalsInputs<'_>) -> Option<Totals> {
    if inputs.model_tokens.is_empty() {
        return None;
    }

    let mut memo = PricingMemo::new(inputs.pricing);
    let mut totals = Totals::default();
    for (model, aggregate) in inputs.model_tokens.iter() {
        totals.total_tokens = totals.total_tokens.saturating_add(aggregate);

        let Some(record) = inputs.cache.and_then(|c| c.model_usage.get(model)) else {
            continue;
        };
        let Some(parts) = apportion(aggregate, record) else {
            continue;
        };
        totals.tokens.add(&parts);

        let ratio = aggregate as f64 / record.component_sum() as f64;
        totals.cost_usd += match record.cost_usd {
            Some(cost) => cost * ratio,
            None => memo.estimate(model, &parts),
        };
    }
    Some(totals)
}

/// Split `aggregate` into four categories in the proportions of `record`.
///
/// Components are rounded, then the input component absorbs rounding drift,
/// so the parts always sum to exactly `aggregate`. `None` when the record
/// has no tokens to take proportions from.
pub fn apportion(aggregate: u64, record: &CacheModelUsage) -> Option<TokenCounts> {
    let sum = record.component_sum();
    if sum == 0 {
        return None;
    }

    let ratio = aggregate as f64 / sum as f64;
    let scale = |v: u64| (v as f64 * ratio).round() as i128;
    let mut parts = [
        scale(record.input_tokens),
        scale(record.output_tokens),
        scale(record.cache_read_input_tokens),
        scale(record.cache_creation_input_tokens),
    ];

    let drift = aggregate as i128 - parts.iter().sum::<i128>();
    parts[0] += drift;
    if parts[0] < 0 {
        // Input cannot go negative: take the remainder from the largest part
        let deficit = -parts[0];
        parts[0] = 0;
        if let Some(largest) = parts[1..].iter_mut().max() {
            *largest -= deficit;
        }
    }

    let part = |i: usize| u64::try_from(parts[i]).unwrap_or(0);
    Some(TokenCounts {
        input_tokens: part(0),
        output_tokens: part(1),
        cache_read_tokens: part(2),
        cache_write_tokens: part(3),
    })
}

// ========== rankings ==========

/// Rank every model by tokens (stable: ties keep encounter order)
pub fn rank_models(
    model_tokens: &ModelTokenMap,
    total_tokens: u64,
    directory: &dyn ModelDirectory,
) -> Vec<RankingEntry> {
    let mut ranked: Vec<RankingEntry> = model_tokens
        .iter()
        .filter(|(_, t)| *t > 0)
        .map(|(model, tokens)| {
            let info = resolve_model(directory, model);
            RankingEntry {
                id: model.to_string(),
                display_name: info.display_name,
                provider: info.provider,
                tokens,
                percentage: percentage(tokens, total_tokens),
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.tokens.cmp(&a.tokens));
    ranked
}

/// Roll models up to providers in model encounter order, then rank
/// (stable: ties keep the order each provider was first seen)
pub fn rank_providers(
    model_tokens: &ModelTokenMap,
    total_tokens: u64,
    directory: &dyn ModelDirectory,
) -> Vec<RankingEntry> {
    let mut providers: Vec<RankingEntry> = Vec::new();
    for (model, tokens) in model_tokens.iter().filter(|(_, t)| *t > 0) {
        let provider = resolve_model(directory, model).provider;
        match providers.iter_mut().find(|p| p.id == provider) {
            Some(p) => p.tokens = p.tokens.saturating_add(tokens),
            None => providers.push(RankingEntry {
                id: provider.clone(),
                display_name: provider_display_name(&provider),
                provider,
                tokens,
                percentage: 0.0,
            }),
        }
    }
    for p in &mut providers {
        p.percentage = percentage(p.tokens, total_tokens);
    }
    providers.sort_by(|a, b| b.tokens.cmp(&a.tokens));
    providers
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

pub fn cache_hit_rate(cache_read: u64, cache_write: u64) -> f64 {
    let denominator = cache_read.saturating_add(cache_write);
    if denominator == 0 {
        0.0
    } else {
        cache_read as f64 / denominator as f64 * 100.0
    }
}

// ========== first session ==========

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn parse_first_session(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_cache_date(raw).map(midnight_utc))
}

/// Live earliest timestamp, else the cache's first-session date, else the
/// earliest active day, else `now`
pub fn first_session_date(
    live: &UsageSummary,
    cache: Option<&StatsCache>,
    daily: &BTreeMap<NaiveDate, u64>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    live.earliest
        .or_else(|| {
            cache
                .and_then(|c| c.first_session_date.as_deref())
                .and_then(parse_first_session)
        })
        .or_else(|| daily.keys().next().copied().map(midnight_utc))
        .unwrap_or(now)
}

fn whole_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().div_euclid(86_400)
}

// ========== merge ==========

pub struct StatsMerger;

impl StatsMerger {
    pub fn merge(
        ctx: &MergeContext<'_>,
        live: &UsageSummary,
        cache: Option<&StatsCache>,
    ) -> StatsSnapshot {
        let inputs = MergeInputs {
            period: ctx.period,
            live,
            cache,
        };

        let (activity_source, activity) =
            decide(&inputs, &activity_rules()).unwrap_or((DataSource::Empty, Activity::default()));
        let (sessions_source, total_sessions) =
            decide(&inputs, &session_rules()).unwrap_or((DataSource::Empty, 0));
        let (tool_calls_source, total_tool_calls) =
            decide(&inputs, &tool_call_rules()).unwrap_or((DataSource::Empty, 0));
        let (model_tokens_source, model_tokens) = decide(&inputs, &model_token_rules())
            .unwrap_or((DataSource::Empty, ModelTokenMap::new()));

        let totals_inputs = TotalsInputs {
            live,
            cache,
            model_tokens: &model_tokens,
            pricing: ctx.pricing,
        };
        let (totals_source, totals) =
            decide(&totals_inputs, &totals_rules()).unwrap_or((DataSource::Empty, Totals::default()));

        let mut web_search_requests = 0u64;
        let mut peak_context_window = 0u64;
        for (model, _) in model_tokens.iter() {
            if let Some(record) = inputs.usage_record(model) {
                web_search_requests = web_search_requests.saturating_add(record.web_search_requests);
                peak_context_window = peak_context_window.max(record.context_window.unwrap_or(0));
            }
        }

        let ranked_models = rank_models(&model_tokens, totals.total_tokens, ctx.directory);
        let mut top_providers = rank_providers(&model_tokens, totals.total_tokens, ctx.directory);
        top_providers.truncate(TOP_N);
        let models_used = ranked_models.len();
        let mut top_models = ranked_models;
        top_models.truncate(TOP_N);

        let today = ctx.now.with_timezone(&Local).date_naive();
        let streaks = temporal::streaks(&activity.daily, today);
        let first_session_date = first_session_date(live, cache, &activity.daily, ctx.now);

        StatsSnapshot {
            period: ctx.period,
            generated_at: ctx.now,
            has_data: !activity.daily.is_empty() || totals.total_tokens > 0,
            first_session_date,
            days_since_first_session: whole_days_between(first_session_date, ctx.now),
            total_sessions,
            total_messages: activity.messages,
            total_tool_calls,
            total_tokens: totals.total_tokens,
            total_input_tokens: totals.tokens.input_tokens,
            total_output_tokens: totals.tokens.output_tokens,
            total_cache_read_tokens: totals.tokens.cache_read_tokens,
            total_cache_write_tokens: totals.tokens.cache_write_tokens,
            total_cost: totals.cost_usd,
            cache_hit_rate: cache_hit_rate(
                totals.tokens.cache_read_tokens,
                totals.tokens.cache_write_tokens,
            ),
            web_search_requests,
            peak_context_window,
            models_used,
            top_models,
            top_providers,
            active_days: activity.daily.values().filter(|&&c| c > 0).count(),
            max_streak: streaks.max_streak,
            max_streak_days: streaks.max_streak_days,
            current_streak: streaks.current_streak,
            most_active_day: temporal::most_active_day(&activity.daily),
            weekday_activity: temporal::weekday_distribution(&activity.daily),
            monthly_activity: temporal::monthly_distribution(&activity.daily),
            heatmap: temporal::heatmap(&activity.daily, ctx.period),
            daily_activity: activity.daily,
            sources: SourceReport {
                activity: activity_source,
                sessions: sessions_source,
                tool_calls: tool_calls_source,
                model_tokens: model_tokens_source,
                token_totals: totals_source,
            },
        }
    }
}
