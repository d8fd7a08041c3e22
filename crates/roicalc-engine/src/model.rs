//! Domain values exchanged with hosts.
//!
//! All values are expressed in UI units: percentages as `0..=100`, durations in
//! the unit named by the field.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of points in the cumulative return series.
pub const MONTHLY_POINTS: usize = 36;

/// User-editable business inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiInputs {
    pub developers: f64,
    pub avg_yearly_loaded_cost: f64,

    pub tickets_per_dev_per_month: f64,
    pub avg_handling_time_hours: f64,
    pub pct_tickets_migrated: f64,

    pub devs_onboarded_per_year: f64,
    pub time_to_onboard_weeks: f64,
    pub onboarding_efficiency_gain_pct: f64,
    pub senior_engineer_time_per_new_dev_hours: f64,

    pub non_core_time_per_dev_per_month_hours: f64,
    pub efficiency_gain_pct: f64,

    pub agentic_workflows_live: f64,
    pub time_saved_per_workflow_trigger_hours: f64,
    pub workflow_triggers_per_dev_per_month: f64,
}

impl Default for RoiInputs {
    fn default() -> Self {
        Self {
            developers: 50.0,
            avg_yearly_loaded_cost: 200_000.0,
            tickets_per_dev_per_month: 4.0,
            avg_handling_time_hours: 0.75,
            pct_tickets_migrated: 25.0,
            devs_onboarded_per_year: 12.0,
            time_to_onboard_weeks: 2.0,
            onboarding_efficiency_gain_pct: 30.0,
            senior_engineer_time_per_new_dev_hours: 10.0,
            non_core_time_per_dev_per_month_hours: 16.0,
            efficiency_gain_pct: 10.0,
            agentic_workflows_live: 5.0,
            time_saved_per_workflow_trigger_hours: 0.25,
            workflow_triggers_per_dev_per_month: 8.0,
        }
    }
}

impl RoiInputs {
    pub fn get(&self, field: InputField) -> f64 {
        match field {
            InputField::Developers => self.developers,
            InputField::AvgYearlyLoadedCost => self.avg_yearly_loaded_cost,
            InputField::TicketsPerDevPerMonth => self.tickets_per_dev_per_month,
            InputField::AvgHandlingTimeHours => self.avg_handling_time_hours,
            InputField::PctTicketsMigrated => self.pct_tickets_migrated,
            InputField::DevsOnboardedPerYear => self.devs_onboarded_per_year,
            InputField::TimeToOnboardWeeks => self.time_to_onboard_weeks,
            InputField::OnboardingEfficiencyGainPct => self.onboarding_efficiency_gain_pct,
            InputField::SeniorEngineerTimePerNewDevHours => {
                self.senior_engineer_time_per_new_dev_hours
            }
            InputField::NonCoreTimePerDevPerMonthHours => {
                self.non_core_time_per_dev_per_month_hours
            }
            InputField::EfficiencyGainPct => self.efficiency_gain_pct,
            InputField::AgenticWorkflowsLive => self.agentic_workflows_live,
            InputField::TimeSavedPerWorkflowTriggerHours => {
                self.time_saved_per_workflow_trigger_hours
            }
            InputField::WorkflowTriggersPerDevPerMonth => self.workflow_triggers_per_dev_per_month,
        }
    }

    pub fn set(&mut self, field: InputField, value: f64) {
        let slot = match field {
            InputField::Developers => &mut self.developers,
            InputField::AvgYearlyLoadedCost => &mut self.avg_yearly_loaded_cost,
            InputField::TicketsPerDevPerMonth => &mut self.tickets_per_dev_per_month,
            InputField::AvgHandlingTimeHours => &mut self.avg_handling_time_hours,
            InputField::PctTicketsMigrated => &mut self.pct_tickets_migrated,
            InputField::DevsOnboardedPerYear => &mut self.devs_onboarded_per_year,
            InputField::TimeToOnboardWeeks => &mut self.time_to_onboard_weeks,
            InputField::OnboardingEfficiencyGainPct => &mut self.onboarding_efficiency_gain_pct,
            InputField::SeniorEngineerTimePerNewDevHours => {
                &mut self.senior_engineer_time_per_new_dev_hours
            }
            InputField::NonCoreTimePerDevPerMonthHours => {
                &mut self.non_core_time_per_dev_per_month_hours
            }
            InputField::EfficiencyGainPct => &mut self.efficiency_gain_pct,
            InputField::AgenticWorkflowsLive => &mut self.agentic_workflows_live,
            InputField::TimeSavedPerWorkflowTriggerHours => {
                &mut self.time_saved_per_workflow_trigger_hours
            }
            InputField::WorkflowTriggersPerDevPerMonth => {
                &mut self.workflow_triggers_per_dev_per_month
            }
        };
        *slot = value;
    }
}

/// Editable model assumptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiAssumptions {
    pub license_cost: f64,
    pub port_fte: f64,
    pub launch_offset: f64,
    pub adoption_months: f64,
}

impl RoiAssumptions {
    pub fn get(&self, field: AssumptionField) -> f64 {
        match field {
            AssumptionField::LicenseCost => self.license_cost,
            AssumptionField::PortFte => self.port_fte,
            AssumptionField::LaunchOffset => self.launch_offset,
            AssumptionField::AdoptionMonths => self.adoption_months,
        }
    }

    pub fn set(&mut self, field: AssumptionField, value: f64) {
        match field {
            AssumptionField::LicenseCost => self.license_cost = value,
            AssumptionField::PortFte => self.port_fte = value,
            AssumptionField::LaunchOffset => self.launch_offset = value,
            AssumptionField::AdoptionMonths => self.adoption_months = value,
        }
    }
}

/// Logical input field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputField {
    Developers,
    AvgYearlyLoadedCost,
    TicketsPerDevPerMonth,
    AvgHandlingTimeHours,
    PctTicketsMigrated,
    DevsOnboardedPerYear,
    TimeToOnboardWeeks,
    OnboardingEfficiencyGainPct,
    SeniorEngineerTimePerNewDevHours,
    NonCoreTimePerDevPerMonthHours,
    EfficiencyGainPct,
    AgenticWorkflowsLive,
    TimeSavedPerWorkflowTriggerHours,
    WorkflowTriggersPerDevPerMonth,
}

impl InputField {
    pub const ALL: [InputField; 14] = [
        InputField::Developers,
        InputField::AvgYearlyLoadedCost,
        InputField::TicketsPerDevPerMonth,
        InputField::AvgHandlingTimeHours,
        InputField::PctTicketsMigrated,
        InputField::DevsOnboardedPerYear,
        InputField::TimeToOnboardWeeks,
        InputField::OnboardingEfficiencyGainPct,
        InputField::SeniorEngineerTimePerNewDevHours,
        InputField::NonCoreTimePerDevPerMonthHours,
        InputField::EfficiencyGainPct,
        InputField::AgenticWorkflowsLive,
        InputField::TimeSavedPerWorkflowTriggerHours,
        InputField::WorkflowTriggersPerDevPerMonth,
    ];

    /// Fields entered as `0..=100` percentages.
    pub const PERCENT: [InputField; 3] = [
        InputField::PctTicketsMigrated,
        InputField::OnboardingEfficiencyGainPct,
        InputField::EfficiencyGainPct,
    ];

    pub fn key(self) -> &'static str {
        match self {
            InputField::Developers => "developers",
            InputField::AvgYearlyLoadedCost => "avgYearlyLoadedCost",
            InputField::TicketsPerDevPerMonth => "ticketsPerDevPerMonth",
            InputField::AvgHandlingTimeHours => "avgHandlingTimeHours",
            InputField::PctTicketsMigrated => "pctTicketsMigrated",
            InputField::DevsOnboardedPerYear => "devsOnboardedPerYear",
            InputField::TimeToOnboardWeeks => "timeToOnboardWeeks",
            InputField::OnboardingEfficiencyGainPct => "onboardingEfficiencyGainPct",
            InputField::SeniorEngineerTimePerNewDevHours => "seniorEngineerTimePerNewDevHours",
            InputField::NonCoreTimePerDevPerMonthHours => "nonCoreTimePerDevPerMonthHours",
            InputField::EfficiencyGainPct => "efficiencyGainPct",
            InputField::AgenticWorkflowsLive => "agenticWorkflowsLive",
            InputField::TimeSavedPerWorkflowTriggerHours => "timeSavedPerWorkflowTriggerHours",
            InputField::WorkflowTriggersPerDevPerMonth => "workflowTriggersPerDevPerMonth",
        }
    }

    /// Human label used in validation messages.
    pub fn label(self) -> &'static str {
        match self {
            InputField::Developers => "Number of developers",
            InputField::AvgYearlyLoadedCost => "Average developer loaded cost (yearly) ($)",
            InputField::TicketsPerDevPerMonth => "Tickets opened per dev per month",
            InputField::AvgHandlingTimeHours => "Average handling time per ticket (hours)",
            InputField::PctTicketsMigrated => "% tickets migrated to self-service",
            InputField::DevsOnboardedPerYear => "Devs onboarded per year",
            InputField::TimeToOnboardWeeks => "Time required to onboard a new developer (weeks)",
            InputField::OnboardingEfficiencyGainPct => "Accelerated developer onboarding gain (%)",
            InputField::SeniorEngineerTimePerNewDevHours => {
                "Senior engineer time per new dev (hours)"
            }
            InputField::NonCoreTimePerDevPerMonthHours => "Non-core time per dev per month (hrs)",
            InputField::EfficiencyGainPct => "Efficiency gain with Port (%)",
            InputField::AgenticWorkflowsLive => "# agentic workflows live",
            InputField::TimeSavedPerWorkflowTriggerHours => "Time saved per workflow trigger (hrs)",
            InputField::WorkflowTriggersPerDevPerMonth => "Workflow triggers per dev per month",
        }
    }

    pub fn is_percent(self) -> bool {
        Self::PERCENT.contains(&self)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Logical assumption field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssumptionField {
    LicenseCost,
    PortFte,
    LaunchOffset,
    AdoptionMonths,
}

impl AssumptionField {
    pub const ALL: [AssumptionField; 4] = [
        AssumptionField::LicenseCost,
        AssumptionField::PortFte,
        AssumptionField::LaunchOffset,
        AssumptionField::AdoptionMonths,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AssumptionField::LicenseCost => "licenseCost",
            AssumptionField::PortFte => "portFte",
            AssumptionField::LaunchOffset => "launchOffset",
            AssumptionField::AdoptionMonths => "adoptionMonths",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssumptionField::LicenseCost => "Yearly license cost",
            AssumptionField::PortFte => "Full Time Engineers dedicated to IDP",
            AssumptionField::LaunchOffset => "launch offset (months)",
            AssumptionField::AdoptionMonths => "Months to reach 100% adoption",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for AssumptionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Savings use-case whose output is summed into totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ticketops,
    Onboarding,
    Efficiency,
    Agentic,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Ticketops,
        Category::Onboarding,
        Category::Efficiency,
        Category::Agentic,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Category::Ticketops => "from ticketops to Self Service",
            Category::Onboarding => "Developer onboarding",
            Category::Efficiency => "Developer Efficiency Gains",
            Category::Agentic => "Manual tasks to Agentic Workflows",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Ticketops => "ticketops",
            Category::Onboarding => "onboarding",
            Category::Efficiency => "efficiency",
            Category::Agentic => "agentic",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseCaseResult {
    pub hours_saved: f64,
    pub dollars_saved: f64,
}

/// One month of the cumulative return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: f64,
    pub roi: f64,
}

/// Inputs and assumptions as authored in the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub inputs: RoiInputs,
    pub assumptions: RoiAssumptions,
}

/// Outcome of one calculation. Always freshly built; never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub totals: UseCaseResult,
    pub breakdown: BTreeMap<Category, UseCaseResult>,
    pub monthly: Vec<MonthlyPoint>,
    pub assumptions: RoiAssumptions,
}

impl CalculationResult {
    pub fn category(&self, category: Category) -> UseCaseResult {
        self.breakdown.get(&category).copied().unwrap_or_default()
    }

    /// First month whose cumulative return is `>= 0` after having been negative.
    ///
    /// A series that is never negative pays back in its first month; one that never
    /// recovers gives `None`.
    pub fn payback_month(&self) -> Option<f64> {
        let mut seen_negative = false;
        for point in &self.monthly {
            if point.roi < 0.0 {
                seen_negative = true;
            } else if seen_negative {
                return Some(point.month);
            }
        }
        if seen_negative {
            None
        } else {
            self.monthly.first().map(|point| point.month)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_accessors_cover_every_field() {
        let mut inputs = RoiInputs::default();
        for (idx, field) in InputField::ALL.into_iter().enumerate() {
            inputs.set(field, idx as f64 + 0.5);
        }
        for (idx, field) in InputField::ALL.into_iter().enumerate() {
            assert_eq!(inputs.get(field), idx as f64 + 0.5, "{field}");
            assert_eq!(InputField::from_key(field.key()), Some(field));
        }
    }

    #[test]
    fn serde_keys_match_field_keys() {
        let json = serde_json::to_value(RoiInputs::default()).unwrap();
        for field in InputField::ALL {
            assert!(json.get(field.key()).is_some(), "missing {field}");
        }
        let json = serde_json::to_value(RoiAssumptions::default()).unwrap();
        for field in AssumptionField::ALL {
            assert!(json.get(field.key()).is_some(), "missing {field}");
        }
    }

    fn series(roi: impl Fn(f64) -> f64) -> CalculationResult {
        let monthly = (1..=MONTHLY_POINTS)
            .map(|m| MonthlyPoint {
                month: m as f64,
                roi: roi(m as f64),
            })
            .collect();
        CalculationResult {
            totals: UseCaseResult::default(),
            breakdown: BTreeMap::new(),
            monthly,
            assumptions: RoiAssumptions::default(),
        }
    }

    #[test]
    fn payback_month_finds_first_non_negative_point() {
        let result = series(|m| (m - 10.0) * 1_000.0);
        assert_eq!(result.payback_month(), Some(10.0));
        assert_eq!(result.category(Category::Agentic), UseCaseResult::default());
    }

    #[test]
    fn payback_waits_for_recovery_after_a_zero_start() {
        let result = series(|m| {
            if m < 2.0 {
                0.0
            } else if m < 10.0 {
                -5_000.0
            } else {
                (m - 9.0) * 1_000.0
            }
        });
        assert_eq!(result.payback_month(), Some(10.0));
    }

    #[test]
    fn payback_for_series_that_never_dips_or_never_recovers() {
        assert_eq!(series(|_| 0.0).payback_month(), Some(1.0));
        assert_eq!(series(|m| m * 10.0).payback_month(), Some(1.0));
        assert_eq!(series(|m| -m).payback_month(), None);
    }
}
