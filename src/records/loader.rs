//! Load record sets from JSON and holdings from CSV exports

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use csv::Reader;

use super::{AssetBucket, FinancialRecordSet, InvestmentHolding};

/// Raw CSV row of a holdings export
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Bucket")]
    bucket: String,
    #[serde(rename = "CurrentValue")]
    current_value: f64,
    #[serde(rename = "InvestedAmount", default)]
    invested_amount: Option<f64>,
    #[serde(rename = "MonthlySIP", default)]
    monthly_sip: Option<f64>,
    #[serde(rename = "SIPDay", default)]
    sip_day: Option<u32>,
    #[serde(rename = "YearlyContribution", default)]
    yearly_contribution: Option<f64>,
    #[serde(rename = "ExpectedReturn", default)]
    expected_return: Option<f64>,
    #[serde(rename = "MaturityDate", default)]
    maturity_date: Option<String>,
    #[serde(rename = "EmergencyFund", default)]
    emergency_fund: Option<String>,
}

impl CsvRow {
    fn to_holding(self) -> Result<InvestmentHolding> {
        let bucket = parse_bucket(&self.bucket)?;

        let maturity_date = match self.maturity_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .with_context(|| format!("bad MaturityDate {raw:?} for {}", self.name))?,
            ),
        };

        let emergency_fund = matches!(
            self.emergency_fund.as_deref().map(str::trim),
            Some("Y" | "y" | "true" | "TRUE" | "1")
        );

        Ok(InvestmentHolding {
            invested_amount: self.invested_amount.unwrap_or(self.current_value),
            name: self.name,
            bucket,
            current_value: self.current_value,
            monthly_sip: self.monthly_sip,
            sip_day: self.sip_day,
            yearly_contribution: self.yearly_contribution,
            expected_return_pct: self.expected_return,
            maturity_date,
            emergency_fund,
        })
    }
}

fn parse_bucket(raw: &str) -> Result<AssetBucket> {
    let normalized = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
    AssetBucket::ALL
        .into_iter()
        .find(|b| b.as_str() == normalized)
        .ok_or_else(|| anyhow!("Unknown Bucket: {raw}"))
}

/// Load a record set from a JSON file
pub fn load_record_set<P: AsRef<Path>>(path: P) -> Result<FinancialRecordSet> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    load_record_set_from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

/// Load a record set from any JSON reader
pub fn load_record_set_from_reader<R: Read>(reader: R) -> Result<FinancialRecordSet> {
    Ok(serde_json::from_reader(reader)?)
}

/// Load holdings from a CSV file
pub fn load_holdings_csv<P: AsRef<Path>>(path: P) -> Result<Vec<InvestmentHolding>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    load_holdings_from_reader(file)
}

/// Load holdings from any CSV reader
pub fn load_holdings_from_reader<R: Read>(reader: R) -> Result<Vec<InvestmentHolding>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut holdings = Vec::new();

    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        holdings.push(row.to_holding()?);
    }

    Ok(holdings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLDINGS_CSV: &str = "\
Name,Bucket,CurrentValue,InvestedAmount,MonthlySIP,SIPDay,YearlyContribution,ExpectedReturn,MaturityDate,EmergencyFund
Index fund,EQUITY_MF,500000,400000,10000,5,,12,,
Bank FD,fd,200000,,,,,7,2029-03-31,Y
PPF account,PPF,300000,250000,,,150000,7.1,2035-04-01,
";

    #[test]
    fn test_load_holdings_csv() {
        let holdings = load_holdings_from_reader(HOLDINGS_CSV.as_bytes()).unwrap();
        assert_eq!(holdings.len(), 3);

        assert_eq!(holdings[0].bucket, AssetBucket::EquityMf);
        assert_eq!(holdings[0].monthly_sip(), 10_000.0);
        assert_eq!(holdings[0].sip_day, Some(5));

        assert_eq!(holdings[1].bucket, AssetBucket::FixedDeposit);
        assert!(holdings[1].emergency_fund);
        assert_eq!(holdings[1].invested_amount, 200_000.0);
        assert_eq!(holdings[1].maturity_date, NaiveDate::from_ymd_opt(2029, 3, 31));

        assert_eq!(holdings[2].yearly_contribution(), 150_000.0);
    }

    #[test]
    fn test_unknown_bucket_rejected() {
        let csv = "Name,Bucket,CurrentValue\nArt,PAINTINGS,1000\n";
        assert!(load_holdings_from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_bucket_aliases() {
        assert_eq!(parse_bucket("real estate").unwrap(), AssetBucket::RealEstate);
        assert_eq!(parse_bucket("Debt-MF").unwrap(), AssetBucket::DebtMf);
    }

    #[test]
    fn test_load_record_set_defaults() {
        let json = r#"{
            "income_streams": [{"source": "Salary", "monthly_amount": 100000}],
            "goals": [{"name": "Car", "target_amount": 800000, "target_year": 2030}]
        }"#;
        let records = load_record_set_from_reader(json.as_bytes()).unwrap();
        assert_eq!(records.income_streams.len(), 1);
        assert!(records.income_streams[0].active);
        assert!(records.holdings.is_empty());
        assert!(!records.goals[0].is_recurring());
    }

    #[test]
    fn test_load_sample_records() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/sample_records.json");
        let records = load_record_set(path).unwrap();

        assert_eq!(records.holdings.len(), 8);
        assert_eq!(records.loans.len(), 2);
        let money_back = records
            .insurance_policies
            .iter()
            .find(|p| p.name == "Jeevan Money Back")
            .unwrap();
        assert_eq!(money_back.payout_rules.len(), 3);
        assert_eq!(money_back.payout_rules[2].policy_year, 15);
        assert!(records.goals.iter().any(|g| g.is_recurring()));
    }
}
