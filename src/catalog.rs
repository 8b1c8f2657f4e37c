//! Books and orders datasets: CSV records, typed views and search.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub type Record = BTreeMap<String, String>;

/// Parses CSV text whose first line is the header.
///
/// Cells are split on commas outside double quotes; surrounding quotes are
/// stripped and values trimmed. Missing trailing cells become empty strings.
pub fn parse_csv(text: &str) -> Vec<Record> {
    let mut lines = text.trim().lines();
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    if header_line.trim().is_empty() {
        return Vec::new();
    }
    let headers: Vec<String> = header_line.split(',').map(|h| h.trim().to_string()).collect();

    lines
        .map(|line| {
            let values = split_quoted(line);
            headers
                .iter()
                .enumerate()
                .map(|(index, header)| {
                    let raw = values.get(index).map(String::as_str).unwrap_or("");
                    (header.clone(), unquote(raw).trim().to_string())
                })
                .collect()
        })
        .collect()
}

fn split_quoted(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => cells.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    cells.push(current);
    cells
}

fn unquote(raw: &str) -> &str {
    let raw = raw.strip_prefix('"').unwrap_or(raw);
    raw.strip_suffix('"').unwrap_or(raw)
}

fn field<'a>(record: &'a Record, names: &[&str]) -> &'a str {
    names
        .iter()
        .filter_map(|name| record.get(*name))
        .find(|value| !value.is_empty())
        .map(String::as_str)
        .unwrap_or("")
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub price: String,
    pub available: String,
}

impl From<&Record> for Book {
    fn from(record: &Record) -> Self {
        Self {
            id: field(record, &["id", "book_id"]).to_string(),
            title: field(record, &["title"]).to_string(),
            author: field(record, &["author"]).to_string(),
            genre: field(record, &["genre"]).to_string(),
            price: field(record, &["price"]).to_string(),
            available: field(record, &["available"]).to_string(),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub id: String,
    pub customer_name: String,
    pub customer: String,
    pub status: String,
    pub eta: String,
    pub book: String,
    // Key used to match the order to a book (book id, else title)
    pub book_key: String,
    pub order_date: String,
}

impl From<&Record> for Order {
    fn from(record: &Record) -> Self {
        Self {
            order_id: field(record, &["order_id", "id"]).to_string(),
            id: field(record, &["id"]).to_string(),
            customer_name: field(record, &["customer_name", "customer"]).to_string(),
            customer: field(record, &["customer"]).to_string(),
            status: field(record, &["status"]).to_string(),
            eta: field(record, &["eta", "delivery"]).to_string(),
            book: field(record, &["book", "book_title", "title"]).to_string(),
            book_key: field(record, &["book_id", "title"]).to_string(),
            order_date: field(record, &["order_date"]).to_string(),
        }
    }
}

pub fn parse_books(text: &str) -> Vec<Book> {
    parse_csv(text).iter().map(Book::from).collect()
}

pub fn parse_orders(text: &str) -> Vec<Order> {
    parse_csv(text).iter().map(Order::from).collect()
}

fn matches_any(fields: &[&str], query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    fields
        .iter()
        .filter(|f| !f.is_empty())
        .any(|f| f.to_lowercase().contains(query))
}

pub fn search_books<'a>(books: &'a [Book], query: &str) -> Vec<&'a Book> {
    let query = query.to_lowercase();
    books
        .iter()
        .filter(|b| matches_any(&[b.title.as_str(), b.author.as_str(), b.genre.as_str()], &query))
        .collect()
}

pub fn search_orders<'a>(orders: &'a [Order], query: &str) -> Vec<&'a Order> {
    let query = query.to_lowercase();
    orders
        .iter()
        .filter(|o| {
            matches_any(
                &[
                    o.order_id.as_str(),
                    o.id.as_str(),
                    o.status.as_str(),
                    o.customer_name.as_str(),
                    o.customer.as_str(),
                ],
                &query,
            )
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub books: Vec<Book>,
    pub orders: Vec<Order>,
}

impl Catalog {
    /// Loads both datasets concurrently. A missing or unreadable file yields
    /// an empty dataset.
    pub async fn load(books_path: &Path, orders_path: &Path) -> Self {
        let (books, orders) =
            futures::future::join(read_dataset(books_path), read_dataset(orders_path)).await;

        let books = books.map(|t| parse_books(&t)).unwrap_or_else(|e| {
            log::warn!("Books dataset unavailable: {:#}", e);
            Vec::new()
        });
        let orders = orders.map(|t| parse_orders(&t)).unwrap_or_else(|e| {
            log::warn!("Orders dataset unavailable: {:#}", e);
            Vec::new()
        });

        log::info!("Loaded {} books and {} orders", books.len(), orders.len());
        Self { books, orders }
    }
}

async fn read_dataset(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
