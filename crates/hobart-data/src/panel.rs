//! Panel preparation.
//!
//! Joins the asset table with factor returns and derives the per-entity
//! columns every later stage relies on. All validation that can fail the
//! run happens here, before any signal is computed.

use crate::schema::{
    ASSET_COLUMNS, DATE, ENTITY_ID, EXCESS_RETURN, FactorColumn, PERCENT_ASSET_COLUMNS,
    PREV_PRICE, PRICE, RETURN, RISK_FREE,
};
use crate::{DataError, PanelSource, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, info};

/// Options controlling how raw tables become a [`Panel`].
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// First date kept (inclusive).
    pub start: NaiveDate,
    /// Last date kept (inclusive).
    pub end: NaiveDate,
    /// Factor columns to pull from the factor table.
    pub factors: Vec<FactorColumn>,
    /// Whether factor returns and `rf` arrive in percent.
    pub factors_in_percent: bool,
}

impl PrepareOptions {
    /// Options for a date range with no regression factors.
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            factors: Vec::new(),
            factors_in_percent: false,
        }
    }

    /// Request factor columns.
    pub fn with_factors(mut self, factors: impl IntoIterator<Item = FactorColumn>) -> Self {
        self.factors = factors.into_iter().collect();
        self
    }

    /// Mark factor returns as percentage-scaled.
    pub const fn factors_in_percent(mut self, in_percent: bool) -> Self {
        self.factors_in_percent = in_percent;
        self
    }
}

/// A validated asset-by-date panel, sorted by `(entity_id, date)`.
#[derive(Debug, Clone)]
pub struct Panel {
    frame: DataFrame,
    factors: Vec<FactorColumn>,
}

impl Panel {
    /// Wrap an already prepared frame.
    ///
    /// The frame must carry the asset columns, `prev_price`, and the listed
    /// factor columns; it is re-sorted by `(entity_id, date)`.
    pub fn from_frame(frame: DataFrame, factors: Vec<FactorColumn>) -> Result<Self> {
        for column in ASSET_COLUMNS.iter().chain(std::iter::once(&PREV_PRICE)) {
            require_frame_column(&frame, "asset", column)?;
        }
        for factor in &factors {
            require_frame_column(&frame, "factor", factor.name())?;
        }
        let frame = frame.sort([ENTITY_ID, DATE], SortMultipleOptions::default())?;
        Ok(Self { frame, factors })
    }

    /// The underlying frame.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// A lazy view of the panel.
    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    /// Consume the panel, returning the frame.
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Factor columns joined into the panel.
    pub fn factors(&self) -> &[FactorColumn] {
        &self.factors
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Whether `return_rf` is available.
    pub fn has_excess_return(&self) -> bool {
        self.frame.column(EXCESS_RETURN).is_ok()
    }

    /// Number of distinct entities.
    pub fn entity_count(&self) -> Result<usize> {
        Ok(self
            .frame
            .column(ENTITY_ID)?
            .as_materialized_series()
            .n_unique()?)
    }

    /// Length of the longest entity series.
    pub fn max_history(&self) -> Result<usize> {
        let longest = self
            .lazy()
            .group_by([col(ENTITY_ID)])
            .agg([len().alias("n")])
            .select([col("n").max().cast(DataType::UInt64)])
            .collect()?;
        let n = longest.column("n")?.u64()?.get(0).unwrap_or(0);
        Ok(n as usize)
    }
}

/// Load both tables from a source and prepare the panel.
pub fn load_panel(source: &dyn PanelSource, options: &PrepareOptions) -> Result<Panel> {
    let assets = source.load_assets(options.start, options.end)?;
    let factors = source.load_factors(options.start, options.end)?;
    prepare_panel(assets, factors, options)
}

/// Validate, scale, join, and derive the pipeline's base columns.
///
/// Steps:
/// 1. Check required columns in both tables
/// 2. Parse dates and keep `[start, end]`
/// 3. Divide percentage fields by 100
/// 4. Left-join factor returns on `date`
/// 5. Derive `return_rf` (when `rf` is present) and `prev_price` per entity
/// 6. Reject duplicate `(entity_id, date)` keys
pub fn prepare_panel(
    assets: LazyFrame,
    factors: LazyFrame,
    options: &PrepareOptions,
) -> Result<Panel> {
    if options.start > options.end {
        return Err(DataError::InvalidDateRange {
            start: options.start.to_string(),
            end: options.end.to_string(),
        });
    }

    let mut assets = assets;
    let asset_schema = assets.collect_schema()?;
    for column in ASSET_COLUMNS {
        require_schema_column(&asset_schema, "asset", column)?;
    }

    let mut factors_lf = factors;
    let factor_schema = factors_lf.collect_schema()?;
    require_schema_column(&factor_schema, "factor", DATE)?;
    for factor in &options.factors {
        require_schema_column(&factor_schema, "factor", factor.name())?;
    }
    // Regressions run on excess returns, so rf is mandatory once factors are requested
    let has_rf = factor_schema.contains(RISK_FREE);
    if !options.factors.is_empty() && !has_rf {
        return Err(DataError::MissingColumn {
            table: "factor",
            column: RISK_FREE.to_string(),
        });
    }

    let assets = parse_dates(assets, "asset")?
        .lazy()
        .filter(in_range(options.start, options.end))
        .with_column(col(ENTITY_ID).cast(DataType::String))
        .with_columns(
            PERCENT_ASSET_COLUMNS
                .iter()
                .map(|c| (col(*c).cast(DataType::Float64) / lit(100.0)).alias(*c))
                .collect::<Vec<_>>(),
        );

    let mut factor_columns: Vec<&str> = options.factors.iter().map(|f| f.name()).collect();
    if has_rf {
        factor_columns.push(RISK_FREE);
    }
    let factor_scale = if options.factors_in_percent { 100.0 } else { 1.0 };
    let factor_table = parse_dates(
        factors_lf.select(
            std::iter::once(col(DATE))
                .chain(factor_columns.iter().map(|c| col(*c)))
                .collect::<Vec<_>>(),
        ),
        "factor",
    )?
    .lazy()
    .filter(in_range(options.start, options.end))
    .with_columns(
        factor_columns
            .iter()
            .map(|c| (col(*c).cast(DataType::Float64) / lit(factor_scale)).alias(*c))
            .collect::<Vec<_>>(),
    );

    let mut joined = assets.join(
        factor_table,
        [col(DATE)],
        [col(DATE)],
        JoinArgs::new(JoinType::Left),
    );
    if has_rf {
        joined = joined.with_column((col(RETURN) - col(RISK_FREE)).alias(EXCESS_RETURN));
    }

    let frame = joined
        .sort(
            [ENTITY_ID, DATE],
            SortMultipleOptions::default().with_order_descending_multi([false, false]),
        )
        .with_column(
            col(PRICE)
                .cast(DataType::Float64)
                .shift(lit(1))
                .over([col(ENTITY_ID)])
                .alias(PREV_PRICE),
        )
        .collect()?;

    if frame.height() == 0 {
        return Err(DataError::EmptyPanel {
            start: options.start.to_string(),
            end: options.end.to_string(),
        });
    }
    reject_duplicates(&frame)?;

    let panel = Panel {
        frame,
        factors: options.factors.clone(),
    };
    info!(
        rows = panel.height(),
        entities = panel.entity_count()?,
        factors = ?options.factors,
        "prepared panel"
    );
    Ok(panel)
}

/// Cast `date` to a calendar date, failing on values that do not parse.
fn parse_dates(frame: LazyFrame, table: &'static str) -> Result<DataFrame> {
    let parsed = frame
        .with_column(col(DATE).cast(DataType::Date))
        .collect()
        .map_err(|e| DataError::InvalidDate {
            column: format!("{table}.{DATE}"),
            reason: e.to_string(),
        })?;

    // Non-strict casts turn unparsable values into nulls
    let missing = parsed.column(DATE)?.null_count();
    if missing > 0 {
        return Err(DataError::InvalidDate {
            column: format!("{table}.{DATE}"),
            reason: format!("{missing} value(s) are missing or could not be parsed"),
        });
    }
    debug!(table, rows = parsed.height(), "parsed dates");
    Ok(parsed)
}

fn in_range(start: NaiveDate, end: NaiveDate) -> Expr {
    col(DATE).gt_eq(lit(start)).and(col(DATE).lt_eq(lit(end)))
}

fn reject_duplicates(frame: &DataFrame) -> Result<()> {
    let duplicates = frame
        .clone()
        .lazy()
        .group_by([col(ENTITY_ID), col(DATE)])
        .agg([len().alias("n")])
        .filter(col("n").gt(lit(1)))
        .select([col(ENTITY_ID), col(DATE).cast(DataType::String)])
        .limit(1)
        .collect()?;

    if duplicates.height() > 0 {
        let entity_id = duplicates
            .column(ENTITY_ID)?
            .str()?
            .get(0)
            .unwrap_or_default()
            .to_string();
        let date = duplicates
            .column(DATE)?
            .str()?
            .get(0)
            .unwrap_or_default()
            .to_string();
        return Err(DataError::DuplicateKey { entity_id, date });
    }
    Ok(())
}

fn require_schema_column(schema: &Schema, table: &'static str, column: &str) -> Result<()> {
    if schema.contains(column) {
        Ok(())
    } else {
        Err(DataError::MissingColumn {
            table,
            column: column.to_string(),
        })
    }
}

fn require_frame_column(frame: &DataFrame, table: &'static str, column: &str) -> Result<()> {
    frame
        .column(column)
        .map(|_| ())
        .map_err(|_| DataError::MissingColumn {
            table,
            column: column.to_string(),
        })
}
