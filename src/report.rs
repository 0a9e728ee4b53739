use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::utils::format_units;
use alloy::primitives::U256;

use crate::fetcher::BlockSnapshot;

pub const COL1_WIDTH: usize = 22;
pub const COL2_WIDTH: usize = 42;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("unit conversion failed: {0}")]
    Units(String),
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// `100 * gas_used / gas_limit` with two decimals. A zero limit yields `NaN`.
pub fn gas_used_percentage(gas_used: u64, gas_limit: u64) -> String {
    to_fixed_2(gas_used as f64 / gas_limit as f64 * 100.0)
}

// Every finite f64 has at most 1074 fractional digits.
const EXACT_FRACTION_DIGITS: usize = 1074;

/// Two-decimal rendering that rounds exact ties away from zero, so `0.125`
/// becomes `0.13` rather than the `0.12` of `{:.2}`.
fn to_fixed_2(value: f64) -> String {
    if !value.is_finite() {
        return format!("{:.2}", value);
    }

    let exact = format!("{:.*}", EXACT_FRACTION_DIGITS, value.abs());
    let (whole, fraction) = exact.split_once('.').unwrap_or((exact.as_str(), "000"));
    let fraction = fraction.as_bytes();

    let mut digits: Vec<u8> = whole.bytes().chain(fraction[..2].iter().copied()).collect();
    if fraction[2] >= b'5' {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - 2;
    let sign = if value.is_sign_negative() && digits.iter().any(|d| *d != b'0') {
        "-"
    } else {
        ""
    };
    format!(
        "{}{}.{}",
        sign,
        String::from_utf8_lossy(&digits[..split]),
        String::from_utf8_lossy(&digits[split..])
    )
}

/// Scales a wei amount to gwei, keeping at least one fractional digit
/// (`25000000000` renders as `25.0`, `1500000000` as `1.5`).
pub fn format_gwei(wei: U256) -> Result<String, ReportError> {
    let formatted = format_units(wei, "gwei").map_err(|e| ReportError::Units(e.to_string()))?;

    Ok(match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{}.0", whole)
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => format!("{}.0", formatted),
    })
}

fn gwei_field(value: Option<U256>, name: &'static str) -> Result<String, ReportError> {
    let value = value.ok_or(ReportError::MissingField(name))?;
    Ok(format!("{} gwei", format_gwei(value)?))
}

fn push_dash(out: &mut String) {
    out.push_str(&format!("|{}|\n", "-".repeat(COL1_WIDTH + COL2_WIDTH + 5)));
}

fn push_row(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!(
        "| {:<w1$} | {:<w2$} |\n",
        label,
        value,
        w1 = COL1_WIDTH,
        w2 = COL2_WIDTH
    ));
}

fn push_header(out: &mut String, title: &str) {
    out.push('\n');
    push_dash(out);
    out.push_str(&format!("| {:<w$} |\n", title, w = COL1_WIDTH + COL2_WIDTH + 3));
    push_dash(out);
}

/// Renders the gas table for one block.
///
/// Every field is resolved before anything is rendered, so a missing fee
/// yields an error and no partial table.
pub fn render_report(snapshot: &BlockSnapshot) -> Result<String, ReportError> {
    let block = &snapshot.block;
    let fees = &snapshot.fees;

    let max_fee = gwei_field(fees.max_fee_per_gas, "maxFeePerGas")?;
    let priority_fee = gwei_field(fees.max_priority_fee_per_gas, "maxPriorityFeePerGas")?;
    let gas_price = gwei_field(fees.gas_price, "gasPrice")?;
    let base_fee = gwei_field(block.base_fee_per_gas, "baseFeePerGas")?;
    let percentage = gas_used_percentage(block.gas_used, block.gas_limit);

    let mut out = String::with_capacity(1024);
    push_header(&mut out, &format!("Block {}", block.number));
    push_row(&mut out, "Block Number", &block.number.to_string());
    push_row(
        &mut out,
        "Gas Used",
        &format!("{} / {} ({}%)", block.gas_used, block.gas_limit, percentage),
    );
    push_row(&mut out, "Max Fee Per Gas", &max_fee);
    push_row(&mut out, "Max Priority Fee", &priority_fee);
    push_row(&mut out, "Gas Price", &gas_price);
    push_row(&mut out, "Base Fee Per Gas", &base_fee);
    push_row(&mut out, "Transactions in Block", &block.tx_count().to_string());
    push_dash(&mut out);

    Ok(out)
}

/// Writes whole tables to a shared sink, one lock per table.
#[derive(Debug)]
pub struct Reporter<W> {
    sink: Arc<Mutex<W>>,
}

impl<W> Clone for Reporter<W> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    pub fn sink(&self) -> Arc<Mutex<W>> {
        Arc::clone(&self.sink)
    }

    pub fn line(&self, text: &str) -> Result<(), ReportError> {
        self.write_all(&format!("{}\n", text))
    }

    pub fn report(&self, snapshot: &BlockSnapshot) -> Result<(), ReportError> {
        let table = render_report(snapshot)?;
        self.write_all(&table)
    }

    fn write_all(&self, text: &str) -> Result<(), ReportError> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(text.as_bytes())?;
        sink.flush()?;
        Ok(())
    }
}
