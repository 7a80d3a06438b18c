// Energy assistant - keyword-matched canned replies
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Text,
    Recommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceShare {
    pub name: String,
    /// Percent of total consumption
    pub usage: u32,
    pub power: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantReply {
    pub text: String,
    pub kind: ReplyKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceShare>,
}

/// Topics the assistant knows about, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    TopConsumer,
    Yesterday,
    Forecast,
    AirConditioning,
    Savings,
    WeeklyReport,
    Help,
}

impl Topic {
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |needle: &str| lower.contains(needle);

        if has("device") && has("most") {
            Topic::TopConsumer
        } else if has("yesterday") {
            Topic::Yesterday
        } else if has("predict") || has("tomorrow") {
            Topic::Forecast
        } else if has("ac") || has("air conditioning") {
            Topic::AirConditioning
        } else if has("save") || has("money") {
            Topic::Savings
        } else if has("weekly") || has("report") {
            Topic::WeeklyReport
        } else {
            Topic::Help
        }
    }
}

/// Starter questions offered in the chat.
pub const QUICK_QUESTIONS: [&str; 6] = [
    "Which device consumes the most energy?",
    "How much energy did I use yesterday?",
    "Predict tomorrow's energy consumption",
    "What are the best times to run my AC?",
    "How can I save money on electricity?",
    "Show me my weekly energy report",
];

const TOP_CONSUMER: &str = "Based on your current usage, your AC Unit is consuming the most energy at 35% of total consumption (850W). The Refrigerator follows at 25% (120W). Would you like me to suggest ways to optimize these devices?";

const YESTERDAY: &str = "Yesterday you consumed 15.2 kWh of energy, costing approximately $2.28. Your peak usage was between 2-6 PM (2.1 kWh). This is 8% higher than your average daily consumption.";

const FORECAST: &str = "Based on your usage patterns, I predict tomorrow's consumption will be around 16.5 kWh, costing approximately $2.48. The forecast shows higher usage in the afternoon due to expected warmer weather. Consider running energy-intensive appliances during off-peak hours.";

const AIR_CONDITIONING: &str = "For optimal AC usage and energy savings:

- Set temperature to 78\u{b0}F (26\u{b0}C) when home, 85\u{b0}F (29\u{b0}C) when away
- Use programmable thermostat to avoid cooling empty rooms
- Clean or replace filters monthly
- Run during off-peak hours (before 2 PM or after 6 PM)
- Close blinds during peak sun hours

This could save you $15-25 per month!";

const SAVINGS: &str = "Here are my top energy-saving recommendations:

Immediate Savings (0-30 days):
- Turn off lights when not in use: Save $5/month
- Unplug unused devices: Save $8/month
- Use smart power strips: Save $12/month

Medium-term (1-3 months):
- Optimize AC usage: Save $15/month
- Run appliances during off-peak hours: Save $10/month
- Install LED bulbs: Save $8/month

Long-term (3+ months):
- Smart thermostat: Save $20/month
- Energy-efficient appliances: Save $25/month

Total potential savings: $103/month";

const WEEKLY_REPORT: &str = "Here's your weekly energy report:

Week Summary:
- Total Consumption: 95.2 kWh
- Average Daily: 13.6 kWh
- Total Cost: $14.28
- Peak Day: Saturday (18.3 kWh)
- Most Efficient Day: Monday (12.5 kWh)

Trends:
- 5.2% increase from last week
- Weekend usage 15% higher than weekdays
- Peak usage time: 2-6 PM daily

Recommendations:
- Consider reducing weekend AC usage
- Schedule heavy appliances for weekdays
- Your efficiency score improved by 2.5% this week!";

const HELP: &str = "I understand you're asking about energy usage. I can help you with:

- Device energy consumption analysis
- Historical usage reports
- Energy predictions and forecasts
- Cost-saving recommendations
- Peak usage optimization
- Efficiency tips and insights

Could you be more specific about what you'd like to know?";

fn top_consumers() -> Vec<DeviceShare> {
    [
        ("AC Unit", 35, 850.0),
        ("Refrigerator", 25, 120.0),
        ("Washing Machine", 20, 0.0),
        ("Lights", 12, 45.0),
        ("Other", 8, 0.0),
    ]
    .into_iter()
    .map(|(name, usage, power)| DeviceShare {
        name: name.to_string(),
        usage,
        power,
    })
    .collect()
}

/// Answer a chat message from the canned table.
pub fn reply(message: &str, at: DateTime<Utc>) -> AssistantReply {
    let (text, kind, devices) = match Topic::classify(message) {
        Topic::TopConsumer => (TOP_CONSUMER, ReplyKind::Recommendation, top_consumers()),
        Topic::Yesterday => (YESTERDAY, ReplyKind::Text, Vec::new()),
        Topic::Forecast => (FORECAST, ReplyKind::Recommendation, Vec::new()),
        Topic::AirConditioning => (AIR_CONDITIONING, ReplyKind::Recommendation, Vec::new()),
        Topic::Savings => (SAVINGS, ReplyKind::Recommendation, Vec::new()),
        Topic::WeeklyReport => (WEEKLY_REPORT, ReplyKind::Text, Vec::new()),
        Topic::Help => (HELP, ReplyKind::Text, Vec::new()),
    };

    AssistantReply {
        text: text.to_string(),
        kind,
        timestamp: at,
        devices,
    }
}
