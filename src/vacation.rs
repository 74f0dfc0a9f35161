//! Vacation accrual engine.
//!
//! The `vacation` module turns an [`Employee`] and a target month into
//! the monthly leave accrual and the ledger entry that records it. The
//! numeric steps are pure functions over the employee record, the
//! injected [`RuleBook`] and an explicit `today`; persistence is
//! delegated to an [`EmployeeDirectory`]. Month-end batch runs compute
//! per-employee updates in parallel with [`rayon`].
//!
//! Every intermediate value (job percentage, annual days, monthly days,
//! new balance) is rounded to two decimals before it is used again, so
//! results match the entries already stored in the ledger.

use crate::backend::EmployeeDirectory;
use crate::error::{EngineError, Result};
use crate::models::{month_label, AccrualEntry, Employee, VacationUpdate};
use crate::rounding::round2;
use crate::rules::{RuleBook, VacationRuleSet, CUSTOM_COUNTRY};
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Map;
use tracing::{debug, error, info, warn};

/// Contracted weekly hours of a full-time position.
pub const FULL_TIME_HOURS: f64 = 40.0;

/// Whole years between `hire_date` and `today`, floored by month.
///
/// Returns 0 without a hire date. Future hires give a negative value,
/// which simply fails every seniority threshold.
pub fn calculate_seniority(hire_date: Option<NaiveDate>, today: NaiveDate) -> i32 {
    let Some(hired) = hire_date else {
        return 0;
    };
    let years = today.year() - hired.year();
    if today.month() < hired.month() {
        years - 1
    } else {
        years
    }
}

/// Part-time percentage from weekly hours. Missing or zero hours mean
/// exactly 100; contracts above 40 hours are not clamped.
pub fn calculate_job_percentage(expected_hours: Option<f64>) -> f64 {
    match expected_hours {
        Some(hours) if hours != 0.0 && !hours.is_nan() => {
            round2((hours / FULL_TIME_HOURS) * 100.0)
        }
        _ => 100.0,
    }
}

/// Annual entitlement under `rules` for the given seniority.
///
/// Rules are walked in table order and each one is checked twice:
///
/// 1. a non-zero `days` replaces the running value when `years` is set
///    (and non-zero) and the threshold is met;
/// 2. a non-zero `increment` adds `(seniority - years + 1) * increment`
///    when `years` is set and met, capped at `max_days` (zero or absent
///    means no cap).
///
/// Both clauses of the same rule may fire, override first. A later rule
/// overwrites what earlier ones produced; nothing picks a "best" tier.
pub fn annual_entitlement(rules: &VacationRuleSet, seniority: i32) -> f64 {
    let mut annual = rules.base_days;
    for rule in &rules.seniority_rules {
        if let Some(years) = rule.years.filter(|y| *y != 0) {
            if seniority >= years {
                if let Some(days) = rule.days.filter(|d| *d != 0.0) {
                    annual = days;
                }
            }
        }
        if let (Some(increment), Some(years)) = (rule.increment.filter(|i| *i != 0.0), rule.years)
        {
            if seniority >= years {
                let extra_years = f64::from(seniority - years + 1);
                let cap = rule
                    .max_days
                    .filter(|m| *m != 0.0)
                    .unwrap_or(f64::INFINITY);
                annual = (annual + extra_years * increment).min(cap);
            }
        }
    }
    round2(annual)
}

/// Computes accruals against an injected rule book.
#[derive(Debug, Clone)]
pub struct VacationCalculator {
    rules: RuleBook,
}

impl VacationCalculator {
    pub fn new(rules: RuleBook) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Canonical country key of the employee.
    pub fn country_of(&self, employee: &Employee) -> String {
        self.rules.normalize_country(employee.country())
    }

    /// Rule set in force for a canonical country. Caller-supplied custom
    /// rules replace the book's `"Custom"` entry for `"Custom"` employees.
    fn resolve<'a>(
        &'a self,
        country: &str,
        custom: Option<&'a VacationRuleSet>,
    ) -> Option<&'a VacationRuleSet> {
        match custom {
            Some(custom) if country == CUSTOM_COUNTRY => Some(custom),
            _ => self.rules.rules_for(country),
        }
    }

    fn annual_for(
        &self,
        employee: &Employee,
        country: &str,
        today: NaiveDate,
        custom: Option<&VacationRuleSet>,
    ) -> f64 {
        let Some(rules) = self.resolve(country, custom) else {
            error!(employee = %employee.id, %country, "no vacation rules found");
            return 0.0;
        };
        let seniority =
            calculate_seniority(employee.created_at.map(|d| d.date_naive()), today);
        let annual = annual_entitlement(rules, seniority);
        debug!(employee = %employee.id, %country, seniority, annual, "annual vacation days");
        annual
    }

    fn monthly_for(
        &self,
        employee: &Employee,
        country: &str,
        today: NaiveDate,
        custom: Option<&VacationRuleSet>,
    ) -> f64 {
        let annual = self.annual_for(employee, country, today, custom);
        let job_percentage = calculate_job_percentage(employee.expected_hours);
        let monthly = round2((annual / 12.0) * (job_percentage / 100.0));
        debug!(employee = %employee.id, job_percentage, monthly, "monthly vacation days");
        monthly
    }

    /// Annual leave entitlement of `employee` as of `today`.
    pub fn annual_vacation_days(&self, employee: &Employee, today: NaiveDate) -> f64 {
        self.annual_vacation_days_with(employee, today, None)
    }

    /// Like [`annual_vacation_days`](Self::annual_vacation_days), with
    /// `custom` standing in for the book's `"Custom"` entry the same way
    /// [`accrue`](Self::accrue) uses it.
    pub fn annual_vacation_days_with(
        &self,
        employee: &Employee,
        today: NaiveDate,
        custom: Option<&VacationRuleSet>,
    ) -> f64 {
        let country = self.country_of(employee);
        self.annual_for(employee, &country, today, custom)
    }

    /// Days accrued per month: annual entitlement over twelve, scaled by
    /// the job percentage.
    pub fn monthly_vacation_days(&self, employee: &Employee, today: NaiveDate) -> f64 {
        let country = self.country_of(employee);
        self.monthly_for(employee, &country, today, None)
    }

    /// Build the full-replacement update that appends one accrual for
    /// `month`/`year`. The employee record is not modified.
    ///
    /// Employees whose country canonicalises to `"Custom"` need custom
    /// rules with positive base days.
    pub fn accrue(
        &self,
        employee: &Employee,
        month: u32,
        year: i32,
        today: NaiveDate,
        custom: Option<&VacationRuleSet>,
    ) -> Result<VacationUpdate> {
        let country = self.country_of(employee);
        if country == CUSTOM_COUNTRY && custom.map_or(0.0, |c| c.base_days) <= 0.0 {
            return Err(EngineError::validation("invalid custom rules"));
        }
        Ok(self.build_update(employee, country, month, year, today, custom))
    }

    fn build_update(
        &self,
        employee: &Employee,
        country: String,
        month: u32,
        year: i32,
        today: NaiveDate,
        custom: Option<&VacationRuleSet>,
    ) -> VacationUpdate {
        let days_added = self.monthly_for(employee, &country, today, custom);
        let new_balance = round2(employee.vacation_balance + days_added);
        let mut vacation_history = employee.vacation_history.clone();
        vacation_history.push(AccrualEntry {
            month: month_label(month, year),
            days_added,
            new_balance,
            country,
            extra: Map::new(),
        });
        VacationUpdate {
            vacation_balance: new_balance,
            vacation_history,
        }
    }

    /// Plan a month-end accrual for every employee not yet accrued for
    /// the `"<month>/<year>"` label.
    ///
    /// There is no interactive custom input here, so `"Custom"` employees
    /// use the rule book's own `"Custom"` entry.
    pub fn plan_monthly_accrual(
        &self,
        employees: &[Employee],
        month: u32,
        year: i32,
        today: NaiveDate,
    ) -> AccrualPlan {
        let label = month_label(month, year);
        let (done, pending): (Vec<&Employee>, Vec<&Employee>) =
            employees.iter().partition(|e| e.has_accrual_for(&label));
        for employee in &done {
            warn!(employee = %employee.id, %label, "already accrued, skipping");
        }
        let updates = pending
            .into_par_iter()
            .map(|employee| PlannedAccrual {
                employee_id: employee.id.clone(),
                update: self.build_update(
                    employee,
                    self.country_of(employee),
                    month,
                    year,
                    today,
                    None,
                ),
            })
            .collect();
        AccrualPlan {
            label,
            updates,
            skipped: done.into_iter().map(|e| e.id.clone()).collect(),
        }
    }
}

/// Result of [`add_vacation_days`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccrualOutcome {
    /// The ledger row that was appended.
    pub entry: AccrualEntry,
    /// The employee as stored by the backend after the update.
    pub employee: Employee,
}

/// One employee's share of an [`AccrualPlan`].
#[derive(Debug, Clone)]
pub struct PlannedAccrual {
    /// Backend id of the employee.
    pub employee_id: String,
    /// Full-replacement body to submit.
    pub update: VacationUpdate,
}

/// What a month-end run would submit, computed without touching the backend.
#[derive(Debug, Clone)]
pub struct AccrualPlan {
    /// Month label the plan was built for.
    pub label: String,
    /// Employees that need an entry, with their computed updates.
    pub updates: Vec<PlannedAccrual>,
    /// Employees that already hold an entry for `label`.
    pub skipped: Vec<String>,
}

/// Per-employee outcome of a month-end run.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccrualReport {
    /// Month label of the run.
    pub label: String,
    /// Employees whose update the backend accepted.
    pub updated: Vec<String>,
    /// Employees already accrued for the month.
    pub skipped: Vec<String>,
    /// Employees whose update failed; the run carries on past them.
    pub failed: Vec<String>,
}

/// Accrue one month of leave for a single employee and persist it.
///
/// Validation happens before any write; a rejected write leaves the
/// stored balance and history as they were.
pub async fn add_vacation_days<D>(
    directory: &D,
    calculator: &VacationCalculator,
    employee_id: Option<&str>,
    month: u32,
    year: i32,
    today: NaiveDate,
    custom: Option<&VacationRuleSet>,
) -> Result<AccrualOutcome>
where
    D: EmployeeDirectory + ?Sized,
{
    let employee_id = employee_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| EngineError::validation("no employee selected"))?;
    let employee = match directory.get_employee(employee_id).await {
        Ok(employee) => employee,
        Err(EngineError::NotFound(_)) => {
            return Err(EngineError::validation("employee not found"));
        }
        Err(err) => return Err(err),
    };

    let update = calculator.accrue(&employee, month, year, today, custom)?;
    let entry = update
        .appended()
        .cloned()
        .ok_or_else(|| EngineError::validation("empty vacation history"))?;

    match directory.update_vacation(employee_id, &update).await {
        Ok(employee) => {
            info!(
                employee = %employee_id,
                month = %entry.month,
                days_added = entry.days_added,
                new_balance = entry.new_balance,
                "vacation days added"
            );
            Ok(AccrualOutcome { entry, employee })
        }
        Err(err) => {
            error!(employee = %employee_id, error = %err, "failed to update vacation");
            Err(err)
        }
    }
}

/// Month-end accrual over every employee the directory knows.
pub async fn run_monthly_accrual<D>(
    directory: &D,
    calculator: &VacationCalculator,
    month: u32,
    year: i32,
    today: NaiveDate,
) -> Result<AccrualReport>
where
    D: EmployeeDirectory + ?Sized,
{
    let employees = directory.list_employees().await?;
    info!(count = employees.len(), "starting monthly vacation accrual");
    let plan = calculator.plan_monthly_accrual(&employees, month, year, today);

    let mut report = AccrualReport {
        label: plan.label,
        skipped: plan.skipped,
        ..AccrualReport::default()
    };
    for planned in plan.updates {
        match directory
            .update_vacation(&planned.employee_id, &planned.update)
            .await
        {
            Ok(_) => report.updated.push(planned.employee_id),
            Err(err) => {
                error!(employee = %planned.employee_id, error = %err, "monthly accrual failed");
                report.failed.push(planned.employee_id);
            }
        }
    }
    info!(
        label = %report.label,
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "monthly vacation accrual finished"
    );
    Ok(report)
}
