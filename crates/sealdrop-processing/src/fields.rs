//! Parsers for the two semi-structured columns of tabular uploads.
//!
//! Both columns hold a comma-separated list of `name(value)` tokens:
//!
//! ```text
//! list  := token ("," token)*
//! token := ws* name ws* "(" value ")" ws*
//! ```
//!
//! `name` is everything before the last `(` of the token and `value` is
//! everything between it and the closing `)`. Both must be non-empty after
//! trimming. Tokens that do not match are dropped; parsing never fails.

use sealdrop_core::models::{TickerSentiment, Topic};

fn parse_token(token: &str) -> Option<(&str, &str)> {
    let inner = token.trim().strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let name = inner[..open].trim();
    let value = inner[open + 1..].trim();
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some((name, value))
}

fn tokens(input: &str) -> impl Iterator<Item = (&str, &str)> {
    input.split(',').filter_map(parse_token)
}

/// Parse `"AI(0.92), Crypto(0.88)"` into topics. Scores are kept verbatim.
pub fn parse_topics(input: &str) -> Vec<Topic> {
    tokens(input)
        .map(|(topic, score)| Topic {
            topic: topic.to_string(),
            relevance_score: score.to_string(),
        })
        .collect()
}

/// Parse `"BTC(Bullish), ETH(Neutral)"` into ticker sentiments.
pub fn parse_ticker_sentiment(input: &str) -> Vec<TickerSentiment> {
    tokens(input)
        .map(|(ticker, label)| TickerSentiment::new(ticker, label))
        .collect()
}
