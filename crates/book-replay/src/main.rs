//! Replay driver: feed an order event file to the matching engine and
//! check the book's terminal state against the file's result line.
//!
//! Exits 0 when the observed counts match the expected ones, non-zero on
//! any parse error, I/O error or count mismatch.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use book_core::{Order, OrderModify, Orderbook};
use book_protocol::text_codec::{self, Event};
use clap::Parser;
use tracing::debug;

#[derive(Parser)]
#[clap(name = "book-replay")]
#[clap(about = "Replay an order event file against the matching engine")]
struct Cli {
    /// Path to the event file
    input: PathBuf,

    /// Enable debug logging (trades, book mutations)
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt::init();
    }

    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let (events, expected) = text_codec::parse_script(&text)
        .with_context(|| format!("parsing {}", cli.input.display()))?;

    let book = Orderbook::new();
    for event in events {
        match event {
            Event::Add {
                order_type,
                side,
                price,
                quantity,
                id,
            } => {
                let trades = book.add_order(Order::new(order_type, id, side, price, quantity));
                for trade in &trades {
                    debug!("{}", text_codec::format_trade(trade));
                }
            }
            Event::Modify {
                id,
                side,
                price,
                quantity,
            } => {
                let trades = book.modify_order(OrderModify::new(id, side, price, quantity));
                for trade in &trades {
                    debug!("{}", text_codec::format_trade(trade));
                }
            }
            Event::Cancel { id } => book.cancel_order(id),
        }
    }

    let infos = book.level_infos();
    let (total, bids, asks) = (book.size(), infos.bids().len(), infos.asks().len());

    println!("Orderbook size: {total}");
    println!("Bid levels:     {bids}");
    println!("Ask levels:     {asks}");
    println!(
        "Expected:       {} orders, {} bid levels, {} ask levels",
        expected.total, expected.bids, expected.asks
    );

    if (total, bids, asks) != (expected.total, expected.bids, expected.asks) {
        bail!("book state does not match the expected counts");
    }

    Ok(())
}
