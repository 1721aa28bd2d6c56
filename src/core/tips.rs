use crate::core::calculator::FootprintResult;
use crate::core::factors::Category;

const TRANSPORTATION_TIPS: &[&str] = &[
    "Consider carpooling or using public transportation",
    "Try biking or walking for short distances",
    "If possible, work from home a few days a week",
    "Consider an electric or hybrid vehicle for your next purchase",
    "Combine errands to reduce trips",
];

const ELECTRICITY_TIPS: &[&str] = &[
    "Switch to LED bulbs throughout your home",
    "Unplug electronics when not in use",
    "Use energy-efficient appliances",
    "Install solar panels if feasible",
    "Wash clothes in cold water and air dry when possible",
];

const DIET_TIPS: &[&str] = &[
    "Consider incorporating more plant-based meals",
    "Reduce food waste by planning meals carefully",
    "Buy local and seasonal produce when possible",
    "Limit beef consumption, as it has the highest carbon footprint",
    "Grow some of your own vegetables if you have space",
];

const WASTE_TIPS: &[&str] = &[
    "Compost food scraps when possible",
    "Recycle diligently according to local guidelines",
    "Choose products with minimal packaging",
    "Repair items instead of replacing them",
    "Use reusable bags, bottles, and containers",
];

/// Reduction tips for a category, most impactful first.
pub fn tips_for(category: Category) -> &'static [&'static str] {
    match category {
        Category::Transportation => TRANSPORTATION_TIPS,
        Category::Electricity => ELECTRICITY_TIPS,
        Category::Diet => DIET_TIPS,
        Category::Waste => WASTE_TIPS,
    }
}

pub fn top_tips(category: Category, n: usize) -> &'static [&'static str] {
    let tips = tips_for(category);
    &tips[..n.min(tips.len())]
}

/// Short explanation used when no footprint has been calculated yet.
pub fn category_overview(category: Category) -> &'static str {
    match category {
        Category::Transportation => {
            "Transportation typically accounts for a significant portion of personal carbon emissions. \
             To reduce your impact, consider using public transit, carpooling, or cycling when possible."
        }
        Category::Electricity => {
            "Electricity usage contributes significantly to your carbon footprint. \
             Using energy-efficient appliances and being mindful of your consumption can help reduce emissions."
        }
        Category::Diet => {
            "Your dietary choices can have a significant impact on your carbon footprint. \
             Plant-based diets generally have lower carbon emissions than meat-heavy diets."
        }
        Category::Waste => {
            "Waste management plays an important role in your overall carbon footprint. \
             Recycling, composting, and reducing consumption all help minimize waste-related emissions."
        }
    }
}

/// Category with the largest emissions. Ties go to the earliest category in
/// canonical order.
pub fn highest_category(result: &FootprintResult) -> Category {
    let mut best = Category::Transportation;
    let mut best_value = result.emissions(best);

    for (category, value) in result.by_category() {
        if value > best_value {
            best = category;
            best_value = value;
        }
    }

    best
}
