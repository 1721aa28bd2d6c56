use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use carbon_calc::core::{
    tips_for, Category, ConversationState, DietType, FactorTable, LifestyleInput, Region,
    TransportMode,
};
use carbon_calc::report::{all_tips_text, CalculationReport};
use carbon_calc::{Assistant, Config};

use crate::conversation::handle_conversation;

#[derive(Parser)]
#[command(name = "carbon-calc", version)]
#[command(about = "Estimate your annual carbon footprint and learn how to reduce it")]
pub struct Args {
    /// Directory holding config.json
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Calculate your carbon footprint
    Calculate {
        #[command(flatten)]
        lifestyle: LifestyleArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Also list every reduction tip
        #[arg(long)]
        all_tips: bool,
    },
    /// Chat with the carbon footprint assistant
    Chat {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Ask the assistant a single question
    Ask {
        message: String,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Show reduction tips
    Tips {
        /// Transportation, Electricity, Diet or Waste
        #[arg(long)]
        category: Option<Category>,
    },
    /// Show the emission factors of every region
    Regions,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SessionArgs {
    /// Calculate a footprint from the lifestyle flags before chatting
    #[arg(long)]
    pub calculate: bool,

    #[command(flatten)]
    pub lifestyle: LifestyleArgs,

    /// Language model provider (openai, ollama)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name overriding the provider default
    #[arg(long)]
    pub model: Option<String>,

    /// Use keyword replies even if a language model is configured
    #[arg(long)]
    pub offline: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LifestyleArgs {
    /// India, "United States" or "European Union" (defaults to config)
    #[arg(long)]
    pub region: Option<Region>,

    /// Car, "Public Transit", Walking/Cycling or Mixed
    #[arg(long, default_value = "Car")]
    pub mode: TransportMode,

    /// Daily commute distance in km (0-100)
    #[arg(long, default_value_t = 10.0, value_parser = distance_km)]
    pub distance: f64,

    /// Monthly electricity consumption in kWh (0-1000)
    #[arg(long, default_value_t = 200.0, value_parser = electricity_kwh)]
    pub electricity: f64,

    /// Vegetarian, Non-vegetarian or Vegan
    #[arg(long, default_value = "Vegetarian")]
    pub diet: DietType,

    /// Meals per day (0-6)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(0..=6))]
    pub meals: u32,

    /// Waste generated per week in kg (0-100)
    #[arg(long, default_value_t = 5.0, value_parser = waste_kg)]
    pub waste: f64,

    /// People in the household (1-10)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub household: u32,
}

impl LifestyleArgs {
    pub fn into_input(self, default_region: Region) -> LifestyleInput {
        LifestyleInput {
            region: self.region.unwrap_or(default_region),
            transport_mode: self.mode,
            daily_distance_km: self.distance,
            monthly_electricity_kwh: self.electricity,
            diet: self.diet,
            meals_per_day: self.meals,
            weekly_waste_kg: self.waste,
            household_size: self.household,
        }
    }
}

fn bounded(s: &str, max: f64, what: &str) -> std::result::Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number", s))?;
    if !(0.0..=max).contains(&value) {
        return Err(format!("{} must be between 0 and {}", what, max));
    }
    Ok(value)
}

fn distance_km(s: &str) -> std::result::Result<f64, String> {
    bounded(s, 100.0, "distance")
}

fn electricity_kwh(s: &str) -> std::result::Result<f64, String> {
    bounded(s, 1000.0, "electricity")
}

fn waste_kg(s: &str) -> std::result::Result<f64, String> {
    bounded(s, 100.0, "waste")
}

fn load(data_dir: Option<PathBuf>) -> Result<(Config, FactorTable)> {
    let config = Config::new(data_dir)?;
    let table = config.factor_table()?;
    Ok((config, table))
}

pub fn handle_calculate(
    data_dir: Option<PathBuf>,
    lifestyle: LifestyleArgs,
    json: bool,
    all_tips: bool,
) -> Result<()> {
    let (config, table) = load(data_dir)?;
    let input = lifestyle.into_input(config.default_region);
    let report = CalculationReport::build(&table, input).context("Calculation failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.to_text(all_tips));
    }
    Ok(())
}

/// Build the assistant and a greeted session, optionally seeded with a
/// calculation whose report is printed.
fn open_session(config: &Config, table: FactorTable, session: SessionArgs) -> Result<(Assistant, ConversationState)> {
    let assistant = if session.offline {
        Assistant::offline(table)
    } else {
        Assistant::connect(
            table,
            config.get_ai_config(session.provider.as_deref(), session.model),
        )
    };

    let input = session.lifestyle.into_input(config.default_region);
    let mut state = ConversationState::with_greeting(input.region);

    if session.calculate {
        let region = input.region;
        let report = CalculationReport::build(assistant.table(), input).context("Calculation failed")?;
        println!("{}\n", report.to_text(false));
        state.record_footprint(region, report.result);
        assistant.announce_result(&mut state);
    }

    Ok((assistant, state))
}

pub async fn handle_chat(data_dir: Option<PathBuf>, session: SessionArgs) -> Result<()> {
    let (config, table) = load(data_dir)?;
    let (assistant, mut state) = open_session(&config, table, session)?;

    if !assistant.is_delegated() {
        println!(
            "{}",
            "Language model not configured. The assistant will provide basic responses only.".yellow()
        );
    }

    handle_conversation(&assistant, &mut state).await
}

pub async fn handle_ask(data_dir: Option<PathBuf>, message: String, session: SessionArgs) -> Result<()> {
    let (config, table) = load(data_dir)?;
    let (assistant, mut state) = open_session(&config, table, session)?;

    let reply = assistant.reply(&message, &mut state).await;
    println!("{}", reply.content);
    Ok(())
}

pub fn handle_tips(category: Option<Category>) -> Result<()> {
    match category {
        Some(category) => {
            println!("{} tips", category);
            for tip in tips_for(category) {
                println!("  • {}", tip);
            }
        }
        None => println!("{}", all_tips_text()),
    }
    Ok(())
}

pub fn handle_regions(data_dir: Option<PathBuf>) -> Result<()> {
    let (_, table) = load(data_dir)?;

    for (region, factors) in table.regions() {
        println!("🌍 {}", region);
        println!("  Transportation: {} kgCO2/km", factors.transportation);
        println!("  Electricity:    {} kgCO2/kWh", factors.electricity);
        for (diet, factor) in &factors.diet {
            println!("  Diet ({}): {} kgCO2/meal", diet, factor);
        }
        println!("  Waste:          {} kgCO2/kg", factors.waste);
        println!("  Average:        {} tonnes CO2/year", factors.average);
    }
    Ok(())
}
