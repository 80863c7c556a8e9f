/// Gross amount, tax rate and net amount of one transaction. Setting the
/// rate recomputes the net amount and vice versa, so the pair always agrees
/// with `net = gross / (1 + rate / 100)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxFields {
    gross: f64,
    rate: f64,
    net: f64,
}

pub fn net_from_rate(gross: f64, rate: f64) -> f64 {
    gross / (1.0 + rate / 100.0)
}

pub fn rate_from_net(gross: f64, net: f64) -> f64 {
    (gross / net - 1.0) * 100.0
}

/// Parse user input like `19`, `7,5` or `7.5 %`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_end_matches('%').trim().replace(',', ".");
    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some(value)
}

impl TaxFields {
    pub fn new(gross: f64, rate: f64) -> Self {
        let gross = gross.abs();
        Self {
            gross,
            rate,
            net: net_from_rate(gross, rate),
        }
    }

    pub fn gross(&self) -> f64 {
        self.gross
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn net(&self) -> f64 {
        self.net
    }

    pub fn tax_amount(&self) -> f64 {
        self.gross - self.net
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        // -100% would divide by zero
        if rate > -100.0 {
            self.net = net_from_rate(self.gross, rate);
        }
    }

    pub fn set_net(&mut self, net: f64) {
        self.net = net;
        if net > 0.0 {
            self.rate = rate_from_net(self.gross, net);
        }
    }

    pub fn is_rate_valid(&self) -> bool {
        self.rate.is_finite() && (0.0..=100.0).contains(&self.rate)
    }

    /// Non-blocking: a net amount above gross is shown as a warning only.
    pub fn net_exceeds_gross(&self) -> bool {
        self.net > self.gross + 0.005
    }
}
