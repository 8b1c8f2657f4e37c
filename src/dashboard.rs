//! Admin dashboard analytics derived from the catalog and the message log.

use crate::catalog::{Book, Catalog, Order};
use crate::models::{LogEntry, Role};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

const TOP_BOOKS: usize = 5;
const TOP_GENRES: usize = 6;
const RECENT_ORDERS: usize = 3;
const RECENT_CHAT_ENTRIES: usize = 2;
const RECENT_ACTIVITY: usize = 5;
const ACTIVITY_DAYS: i64 = 7;
const QUERY_PREVIEW_CHARS: usize = 50;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_books: usize,
    pub total_orders: usize,
    pub total_chats: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StatusSlice {
    pub status: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ActivityBar {
    pub label: String,
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TopBook {
    pub rank: usize,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub order_count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GenreBar {
    pub genre: String,
    pub count: usize,
    // Relative to the largest genre
    pub width_percent: f64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Order,
    Chat,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Activity {
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub relative_time: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct Dashboard {
    pub summary: Summary,
    pub order_status: Vec<StatusSlice>,
    pub chat_activity: Vec<ActivityBar>,
    pub top_books: Vec<TopBook>,
    pub genres: Vec<GenreBar>,
    pub recent_activity: Vec<Activity>,
}

impl Dashboard {
    pub fn build(catalog: &Catalog, log: &[LogEntry], now: DateTime<Utc>) -> Self {
        Self {
            summary: summary(catalog, log),
            order_status: order_status_breakdown(&catalog.orders),
            chat_activity: chat_activity(log, now.date_naive()),
            top_books: top_books(&catalog.books, &catalog.orders),
            genres: genre_distribution(&catalog.books),
            recent_activity: recent_activity(&catalog.orders, log, now),
        }
    }
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value.to_string()
    }
}

pub fn summary(catalog: &Catalog, log: &[LogEntry]) -> Summary {
    Summary {
        total_books: catalog.books.len(),
        total_orders: catalog.orders.len(),
        total_chats: log.iter().filter(|e| e.role == Role::User).count(),
    }
}

/// Count per status in first-seen order, with its share of all orders.
pub fn order_status_breakdown(orders: &[Order]) -> Vec<StatusSlice> {
    let mut slices: Vec<StatusSlice> = Vec::new();
    for order in orders {
        let status = or_unknown(&order.status);
        match slices.iter_mut().find(|s| s.status == status) {
            Some(slice) => slice.count += 1,
            None => slices.push(StatusSlice {
                status,
                count: 1,
                percentage: 0.0,
            }),
        }
    }
    let total = orders.len() as f64;
    for slice in &mut slices {
        slice.percentage = one_decimal(slice.count as f64 / total * 100.0);
    }
    slices
}

/// Log entries per day for the seven days ending `today`, oldest first.
pub fn chat_activity(log: &[LogEntry], today: NaiveDate) -> Vec<ActivityBar> {
    (0..ACTIVITY_DAYS)
        .rev()
        .map(|days_back| {
            let date = today - Duration::days(days_back);
            let count = log
                .iter()
                .filter(|e| e.timestamp.date_naive() == date)
                .count();
            ActivityBar {
                label: date.format("%a").to_string(),
                date,
                count,
            }
        })
        .collect()
}

/// Books ranked by how many orders reference them by title or id.
pub fn top_books(books: &[Book], orders: &[Order]) -> Vec<TopBook> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for order in orders {
        *counts.entry(order.book_key.as_str()).or_default() += 1;
    }

    let count_for = |book: &Book| -> usize {
        [book.title.as_str(), book.id.as_str()]
            .iter()
            .filter(|key| !key.is_empty())
            .filter_map(|key| counts.get(key).copied())
            .find(|count| *count > 0)
            .unwrap_or(0)
    };

    let mut ranked: Vec<(&Book, usize)> = books.iter().map(|b| (b, count_for(b))).collect();
    // stable: ties keep dataset order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .take(TOP_BOOKS)
        .enumerate()
        .map(|(index, (book, order_count))| TopBook {
            rank: index + 1,
            title: or_unknown(&book.title),
            author: if book.author.is_empty() {
                "Unknown Author".to_string()
            } else {
                book.author.clone()
            },
            genre: or_unknown(&book.genre),
            order_count,
        })
        .collect()
}

pub fn genre_distribution(books: &[Book]) -> Vec<GenreBar> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for book in books {
        let genre = or_unknown(&book.genre);
        match counts.iter_mut().find(|(g, _)| *g == genre) {
            Some((_, count)) => *count += 1,
            None => counts.push((genre, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(TOP_GENRES);

    let max = counts.first().map(|(_, c)| *c).unwrap_or(0).max(1) as f64;
    counts
        .into_iter()
        .map(|(genre, count)| GenreBar {
            genre,
            count,
            width_percent: one_decimal(count as f64 / max * 100.0),
        })
        .collect()
}

pub fn recent_activity(orders: &[Order], log: &[LogEntry], now: DateTime<Utc>) -> Vec<Activity> {
    let mut dated: Vec<(&Order, DateTime<Utc>)> = orders
        .iter()
        .filter_map(|o| parse_order_date(&o.order_date).map(|d| (o, d)))
        .collect();
    dated.sort_by(|a, b| b.1.cmp(&a.1));

    let mut activities: Vec<Activity> = dated
        .into_iter()
        .take(RECENT_ORDERS)
        .map(|(order, timestamp)| {
            let title = if order.status == "Shipped" {
                "Order shipped"
            } else {
                "Order placed"
            };
            let book = if order.book.is_empty() {
                "Book order"
            } else {
                order.book.as_str()
            };
            Activity {
                kind: ActivityKind::Order,
                title: title.to_string(),
                description: format!("Order #{} - {}", order.order_id, book),
                timestamp,
                relative_time: relative_time(timestamp, now),
            }
        })
        .collect();

    activities.extend(
        log.iter()
            .rev()
            .take(RECENT_CHAT_ENTRIES)
            .filter(|e| e.role == Role::User)
            .map(|e| Activity {
                kind: ActivityKind::Chat,
                title: "Customer query".to_string(),
                description: preview(&e.text),
                timestamp: e.timestamp,
                relative_time: relative_time(e.timestamp, now),
            }),
    );

    activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    activities.truncate(RECENT_ACTIVITY);
    activities
}

fn preview(text: &str) -> String {
    if text.chars().count() > QUERY_PREVIEW_CHARS {
        let cut: String = text.chars().take(QUERY_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn parse_order_date(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - then;
    let minutes = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    fn plural(n: i64, unit: &str) -> String {
        format!("{} {}{} ago", n, unit, if n > 1 { "s" } else { "" })
    }

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else {
        plural(days, "day")
    }
}

/// Log entries newest first, as shown in the admin log table.
pub fn log_view(log: &[LogEntry]) -> Vec<&LogEntry> {
    log.iter().rev().collect()
}
