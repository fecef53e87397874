use super::{RowOutcome, SequencerTimings};
use crate::host::{VariantRow, VariationHost, wait_until};
use crate::mapping::VariantKeyMatcher;
use crate::pricing::{PricingConfig, compute_price};
use log::{debug, info, warn};
use tokio::time::sleep;

/// Price every rendered variant row, switching off rows without a spreadsheet price
pub(crate) async fn fill_prices<H: VariationHost + ?Sized>(
    host: &H,
    timings: &SequencerTimings,
    matcher: &VariantKeyMatcher<'_>,
    pricing: &PricingConfig,
) -> Vec<RowOutcome> {
    let outcome = wait_until(
        |_| async move {
            match host.variant_rows().await {
                Ok(rows) if rows.iter().any(|r| r.has_price_input) => Some(rows),
                Ok(_) => None,
                Err(e) => {
                    warn!("Reading variant rows failed: {}", e);
                    None
                }
            }
        },
        timings.rows,
    )
    .await;

    let Some(rows) = outcome.into_value() else {
        warn!("No price inputs found");
        return Vec::new();
    };

    info!("Found {} variant rows", rows.len());

    let mut outcomes = Vec::with_capacity(rows.len());
    for row in &rows {
        outcomes.push(fill_row(host, timings, matcher, pricing, row).await);
    }

    info!("Prices filled");
    outcomes
}

async fn fill_row<H: VariationHost + ?Sized>(
    host: &H,
    timings: &SequencerTimings,
    matcher: &VariantKeyMatcher<'_>,
    pricing: &PricingConfig,
    row: &VariantRow,
) -> RowOutcome {
    let label = row.label();
    if !row.has_price_input {
        warn!("Row {}: no price input", row.index);
        return RowOutcome::NoPriceInput { row: row.index, label };
    }

    debug!("Processing row {}: {}", row.index, label);

    let variant1 = row.variant1.as_deref().unwrap_or_default();
    let price = matcher
        .find_price(variant1, row.variant2.as_deref())
        .and_then(|cell| compute_price(&cell.to_string(), pricing));

    let Some(price) = price else {
        warn!("Price not found for {}, disabling row", label);
        if row.visible != Some(false) {
            set_visibility(host, row.index, false).await;
        }
        return RowOutcome::Disabled { row: row.index, label };
    };

    let mut accepted = None;
    for attempt in 1..=timings.price_fill_attempts.max(1) {
        match host.fill_row_price(row.index, &price).await {
            Ok(Some(shown)) if same_price(&shown, &price) => {
                accepted = Some(attempt);
                break;
            }
            Ok(shown) => debug!("Row {}: field shows {:?} after attempt {}", row.index, shown, attempt),
            Err(e) => warn!("Row {}: filling price failed: {}", row.index, e),
        }
        sleep(timings.after_price).await;
    }

    if row.visible == Some(false) {
        set_visibility(host, row.index, true).await;
    }

    match accepted {
        Some(attempts) => {
            debug!("Row {}: price {}", row.index, price);
            RowOutcome::Priced { row: row.index, label, price, attempts }
        }
        None => {
            warn!("Row {}: price {} not accepted", row.index, price);
            RowOutcome::PriceNotAccepted { row: row.index, label, price }
        }
    }
}

async fn set_visibility<H: VariationHost + ?Sized>(host: &H, row: usize, visible: bool) {
    match host.set_row_visibility(row, visible).await {
        Ok(true) => debug!("Row {}: visibility {}", row, if visible { "on" } else { "off" }),
        Ok(false) => debug!("Row {}: no visibility switch", row),
        Err(e) => warn!("Row {}: toggling visibility failed: {}", row, e),
    }
}

/// Displayed value equals the written one, ignoring thousands separators and trailing zeros
fn same_price(shown: &str, written: &str) -> bool {
    let parse = |s: &str| s.trim().replace(',', "").parse::<f64>().ok();
    match (parse(shown), parse(written)) {
        (Some(a), Some(b)) => (a - b).abs() < 0.005,
        _ => shown.trim() == written.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_price() {
        assert!(same_price("10.99", "10.99"));
        assert!(same_price("1,010.50", "1010.50"));
        assert!(same_price(" 7.0 ", "7.00"));
        assert!(!same_price("", "7.00"));
        assert!(!same_price("7.95", "7.99"));
    }
}
