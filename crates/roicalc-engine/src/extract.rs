//! Reads computed outputs back out of a session.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{
    AssumptionField, CalculationResult, Category, MONTHLY_POINTS, MonthlyPoint, RoiAssumptions,
    UseCaseResult,
};
use crate::schema::FieldSchema;
use crate::session::FormulaEvaluationSession;

/// Maps schema output addresses to result values.
#[derive(Debug, Clone, Copy)]
pub struct ResultExtractor<'a> {
    schema: &'a FieldSchema,
}

impl<'a> ResultExtractor<'a> {
    pub fn new(schema: &'a FieldSchema) -> Self {
        Self { schema }
    }

    pub fn category(&self, session: &FormulaEvaluationSession, category: Category) -> UseCaseResult {
        let binding = self.schema.output(category);
        UseCaseResult {
            hours_saved: session.read_number(&binding.hours),
            dollars_saved: session.read_number(&binding.dollars),
        }
    }

    pub fn breakdown(&self, session: &FormulaEvaluationSession) -> BTreeMap<Category, UseCaseResult> {
        Category::ALL
            .into_iter()
            .map(|category| (category, self.category(session, category)))
            .collect()
    }

    /// Exactly [`MONTHLY_POINTS`] points; unreadable labels default to their position.
    pub fn monthly(&self, session: &FormulaEvaluationSession) -> Vec<MonthlyPoint> {
        let layout = &self.schema.monthly;
        (0..MONTHLY_POINTS as u32)
            .map(|idx| {
                let position = f64::from(idx + 1);
                MonthlyPoint {
                    month: layout
                        .months
                        .cell(idx)
                        .map_or(position, |cell| session.read_number_or(&cell, position)),
                    roi: layout
                        .returns
                        .cell(idx)
                        .map_or(0.0, |cell| session.read_number(&cell)),
                }
            })
            .collect()
    }

    /// Assumptions as the workbook now holds them; non-finite values become 0.
    pub fn assumptions(&self, session: &FormulaEvaluationSession) -> RoiAssumptions {
        let mut assumptions = RoiAssumptions::default();
        for field in AssumptionField::ALL {
            assumptions.set(field, session.read_number(self.schema.assumption(field)));
        }
        assumptions
    }

    pub fn extract(&self, session: &FormulaEvaluationSession) -> CalculationResult {
        let breakdown = self.breakdown(session);
        let totals = breakdown
            .values()
            .fold(UseCaseResult::default(), |acc, r| UseCaseResult {
                hours_saved: acc.hours_saved + r.hours_saved,
                dollars_saved: acc.dollars_saved + r.dollars_saved,
            });
        let monthly = self.monthly(session);
        debug!(
            hours = totals.hours_saved,
            dollars = totals.dollars_saved,
            "results extracted"
        );
        CalculationResult {
            totals,
            breakdown,
            monthly,
            assumptions: self.assumptions(session),
        }
    }
}
