use std::cmp::Ordering;

use crate::models::{AssetContext, SpotAsset, TokenInfo};
use crate::utils::format::round_dp;

use super::series::percent_change;

const PANEL_SIZE: usize = 5;

fn token_row(meta: &SpotAsset, ctx: &AssetContext, price: String) -> TokenInfo {
    TokenInfo {
        name: meta.name.clone(),
        symbol: meta.name.clone(),
        price,
        change_24h: round_dp(percent_change(ctx.mark(), ctx.previous_day()), 1),
        volume_24h: ctx.day_volume_notional.clone(),
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Top 5 spot pairs by 24h notional volume. Stablecoin pairs get an extra
/// decimal so their price still moves on screen.
pub fn hot_tokens(pairs: &[(&SpotAsset, &AssetContext)]) -> Vec<TokenInfo> {
    let mut ranked: Vec<_> = pairs.to_vec();
    ranked.sort_by(|a, b| descending(a.1.day_volume(), b.1.day_volume()));

    ranked
        .into_iter()
        .take(PANEL_SIZE)
        .map(|(meta, ctx)| {
            let decimals = if meta.name == "USDT" { 3 } else { 2 };
            let price = format!("US${:.*}", decimals, ctx.mark());
            token_row(meta, ctx, price)
        })
        .collect()
}

/// Top 5 spot pairs by 24h gain. Non-positive movers are out; so are moves
/// of 1000% and up, which on this venue are always fresh listings with a
/// garbage previous-day price rather than real gainers.
pub fn top_gainers(pairs: &[(&SpotAsset, &AssetContext)]) -> Vec<TokenInfo> {
    let mut ranked: Vec<_> = pairs
        .iter()
        .map(|&(meta, ctx)| {
            let change = percent_change(ctx.mark(), ctx.previous_day());
            (meta, ctx, change)
        })
        .filter(|&(_, _, change)| change > 0.0 && change < 1000.0)
        .collect();
    ranked.sort_by(|a, b| descending(a.2, b.2));

    ranked
        .into_iter()
        .take(PANEL_SIZE)
        .map(|(meta, ctx, _)| token_row(meta, ctx, sub_dollar_price(ctx.mark())))
        .collect()
}

/// Most recently listed spot pairs, approximated as the last 5 universe
/// entries. The venue appends new pairs to the universe, so index order is
/// listing order; there is no dedicated listings feed to do better with.
pub fn new_tokens(pairs: &[(&SpotAsset, &AssetContext)]) -> Vec<TokenInfo> {
    let start = pairs.len().saturating_sub(PANEL_SIZE);
    pairs[start..]
        .iter()
        .map(|&(meta, ctx)| token_row(meta, ctx, sub_dollar_price(ctx.mark())))
        .collect()
}

fn sub_dollar_price(price: f64) -> String {
    if price < 1.0 {
        format!("US${:.6}", price)
    } else {
        format!("US${:.2}", price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> SpotAsset {
        SpotAsset {
            name: name.to_string(),
            index: 0,
            is_canonical: true,
        }
    }

    fn ctx(mark: &str, prev: &str, volume: &str) -> AssetContext {
        serde_json::from_str(&format!(
            r#"{{"markPx":"{}","prevDayPx":"{}","dayNtlVlm":"{}"}}"#,
            mark, prev, volume
        ))
        .unwrap()
    }

    #[test]
    fn hot_tokens_rank_by_volume_descending() {
        let assets = vec![asset("PURR"), asset("HFUN"), asset("USDT")];
        let ctxs = vec![
            ctx("0.5", "0.4", "100.0"),
            ctx("2.0", "1.0", "900.0"),
            ctx("1.0001", "1.0", "500.0"),
        ];
        let pairs: Vec<_> = assets.iter().zip(ctxs.iter()).collect();

        let hot = hot_tokens(&pairs);
        assert_eq!(hot.len(), 3);
        assert_eq!(hot[0].name, "HFUN");
        assert_eq!(hot[1].name, "USDT");
        assert_eq!(hot[2].name, "PURR");
        // USDT pairs get three decimals, everything else two.
        assert_eq!(hot[1].price, "US$1.000");
        assert_eq!(hot[0].price, "US$2.00");
    }

    #[test]
    fn hot_tokens_truncate_to_five() {
        let assets: Vec<_> = (0..8).map(|i| asset(&format!("T{}", i))).collect();
        let ctxs: Vec<_> = (0..8)
            .map(|i| ctx("1.0", "1.0", &format!("{}.0", i * 10)))
            .collect();
        let pairs: Vec<_> = assets.iter().zip(ctxs.iter()).collect();
        assert_eq!(hot_tokens(&pairs).len(), 5);
    }

    #[test]
    fn gainers_exclude_losers_and_listing_spikes() {
        let assets = vec![asset("UP"), asset("DOWN"), asset("SPIKE"), asset("FLAT")];
        let ctxs = vec![
            ctx("1.5", "1.0", "10.0"),  // +50%
            ctx("0.5", "1.0", "10.0"),  // -50%
            ctx("20.0", "0.001", "10.0"), // ~2M%, fresh listing
            ctx("1.0", "0", "10.0"),    // no previous price
        ];
        let pairs: Vec<_> = assets.iter().zip(ctxs.iter()).collect();

        let gainers = top_gainers(&pairs);
        assert_eq!(gainers.len(), 1);
        assert_eq!(gainers[0].name, "UP");
        assert_eq!(gainers[0].change_24h, 50.0);
        assert_eq!(gainers[0].price, "US$1.50");
    }

    #[test]
    fn gainers_use_six_decimals_below_a_dollar() {
        let assets = vec![asset("MICRO")];
        let ctxs = vec![ctx("0.512345", "0.4", "10.0")];
        let pairs: Vec<_> = assets.iter().zip(ctxs.iter()).collect();

        let gainers = top_gainers(&pairs);
        assert_eq!(gainers[0].price, "US$0.512345");
        // Change is rounded to one decimal place.
        assert_eq!(gainers[0].change_24h, 28.1);
    }

    #[test]
    fn new_tokens_take_the_universe_tail() {
        let assets: Vec<_> = (0..7).map(|i| asset(&format!("T{}", i))).collect();
        let ctxs: Vec<_> = (0..7).map(|_| ctx("1.0", "1.0", "10.0")).collect();
        let pairs: Vec<_> = assets.iter().zip(ctxs.iter()).collect();

        let fresh = new_tokens(&pairs);
        assert_eq!(fresh.len(), 5);
        assert_eq!(fresh[0].name, "T2");
        assert_eq!(fresh[4].name, "T6");
    }

    #[test]
    fn new_tokens_handle_short_universes() {
        let assets = vec![asset("ONLY")];
        let ctxs = vec![ctx("1.0", "1.0", "10.0")];
        let pairs: Vec<_> = assets.iter().zip(ctxs.iter()).collect();
        assert_eq!(new_tokens(&pairs).len(), 1);
    }
}
