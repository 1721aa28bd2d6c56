use serde::Serialize;

use crate::core::{
    compare, compute, format_amount, highest_category, tips_for, top_tips, Category, ComparisonVerdict,
    FactorTable, FootprintResult, LifestyleInput, Result,
};

/// Tips shown for the highest-emitting category.
pub const HIGHLIGHT_TIPS: usize = 3;

/// Everything produced by one calculation, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationReport {
    pub input: LifestyleInput,
    pub result: FootprintResult,
    pub comparison: ComparisonVerdict,
    pub highest_category: Category,
    pub tips: Vec<&'static str>,
}

impl CalculationReport {
    pub fn build(table: &FactorTable, input: LifestyleInput) -> Result<Self> {
        let result = compute(table, &input)?;
        let comparison = compare(table, result.total, input.region)?;
        let highest = highest_category(&result);

        Ok(CalculationReport {
            input,
            result,
            comparison,
            highest_category: highest,
            tips: top_tips(highest, HIGHLIGHT_TIPS).to_vec(),
        })
    }

    pub fn to_text(&self, all_tips: bool) -> String {
        let mut lines = vec!["Carbon emissions by category".to_string()];
        for (category, value) in self.result.by_category() {
            lines.push(format!("  {:<15} {} tonnes CO2/year", format!("{}:", category), format_amount(value)));
        }

        lines.push(String::new());
        lines.push(format!(
            "Your total carbon footprint: {} tonnes CO2/year",
            format_amount(self.result.total)
        ));
        lines.push(format!("Your emissions are {}", self.comparison.describe()));

        lines.push(String::new());
        lines.push(format!("Tips to reduce your {} emissions", self.highest_category));
        for tip in &self.tips {
            lines.push(format!("  ✅ {}", tip));
        }

        if all_tips {
            lines.push(String::new());
            lines.push(all_tips_text());
        }

        lines.join("\n")
    }
}

/// Every tip of every category, grouped by category.
pub fn all_tips_text() -> String {
    let mut lines = vec!["Comprehensive reduction tips".to_string()];
    for category in Category::ALL {
        lines.push(format!("{} tips", category));
        for tip in tips_for(category) {
            lines.push(format!("  • {}", tip));
        }
    }
    lines.join("\n")
}
