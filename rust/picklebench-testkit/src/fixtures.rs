//! The benchmark's test value: an order document with a customer, a list of
//! line items and a few scalar fields. Every type derives both the serde and
//! the protobuf traits so the same value drives every codec.

use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Customer {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(string, repeated, tag = "4")]
    pub addresses: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct LineItem {
    #[prost(string, tag = "1")]
    pub sku: String,
    #[prost(string, tag = "2")]
    pub description: String,
    #[prost(uint32, tag = "3")]
    pub quantity: u32,
    #[prost(double, tag = "4")]
    pub unit_price: f64,
    #[prost(bool, tag = "5")]
    pub gift_wrap: bool,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Order {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub reference: String,
    #[prost(message, optional, tag = "3")]
    pub customer: Option<Customer>,
    #[prost(message, repeated, tag = "4")]
    pub items: Vec<LineItem>,
    #[prost(double, tag = "5")]
    pub total: f64,
    #[prost(int64, tag = "6")]
    pub created_at: i64,
    #[prost(string, repeated, tag = "7")]
    pub tags: Vec<String>,
    #[prost(bool, tag = "8")]
    pub express: bool,
}

const WORDS: &[&str] = &[
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa",
];

const TAGS: &[&str] = &["priority", "wholesale", "retail", "returning", "promo", "backorder"];

/// The default benchmark value: 32 line items, seed 0.
pub fn test_value() -> Order {
    sample_order(0, 32)
}

/// Builds a deterministic order with `item_count` line items.
///
/// Prices are multiples of 0.25 so that they survive text round trips
/// exactly.
pub fn sample_order(seed: u64, item_count: usize) -> Order {
    let mut rng = fastrand::Rng::with_seed(seed);

    let customer = Customer {
        id: rng.u64(1..1_000_000),
        name: format!("{} {}", pick(&mut rng, WORDS), pick(&mut rng, WORDS)),
        email: format!("{}@example.com", pick(&mut rng, WORDS)),
        addresses: (0..rng.usize(1..=3))
            .map(|i| format!("{} {} Street, Suite {i}", rng.u32(1..9999), pick(&mut rng, WORDS)))
            .collect(),
    };

    let items: Vec<LineItem> = (0..item_count)
        .map(|i| LineItem {
            sku: format!("SKU-{:06}", rng.u32(0..1_000_000)),
            description: format!(
                "{} {} item #{i}",
                pick(&mut rng, WORDS),
                pick(&mut rng, WORDS)
            ),
            quantity: rng.u32(1..20),
            unit_price: rng.u32(1..40_000) as f64 * 0.25,
            gift_wrap: rng.bool(),
        })
        .collect();
    let total = items
        .iter()
        .map(|item| item.unit_price * item.quantity as f64)
        .sum();

    Order {
        id: seed,
        reference: format!("ORD-{seed:08}-{}", rng.u32(..)),
        customer: Some(customer),
        items,
        total,
        created_at: rng.i64(1_500_000_000_000..1_800_000_000_000),
        tags: (0..rng.usize(0..4))
            .map(|_| pick(&mut rng, TAGS).to_string())
            .collect(),
        express: rng.bool(),
    }
}

fn pick<'a>(rng: &mut fastrand::Rng, words: &[&'a str]) -> &'a str {
    words[rng.usize(..words.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_order_is_deterministic() {
        assert_eq!(sample_order(5, 10), sample_order(5, 10));
        assert_ne!(sample_order(5, 10), sample_order(6, 10));
        let order = test_value();
        assert_eq!(order.items.len(), 32);
        assert!(order.customer.is_some());
        assert!(order.total > 0.0);
    }

    #[test]
    fn test_empty_order() {
        let order = sample_order(1, 0);
        assert!(order.items.is_empty());
        assert_eq!(order.total, 0.0);
        assert_eq!(Order::default().customer, None);
    }
}
