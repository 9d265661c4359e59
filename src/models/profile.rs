use serde::{de, Deserialize, Deserializer, Serialize};

/// ---------------------------------------------------------------------------
/// Training Days
/// ---------------------------------------------------------------------------

/// One of the seven canonical weekday names used on the wire.
///
/// Serialized as the full Polish name; deserializing goes through
/// `parse_lenient`, so English names, names without diacritics and common
/// abbreviations are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrainingDay {
  #[serde(rename = "poniedziałek")]
  Monday,
  #[serde(rename = "wtorek")]
  Tuesday,
  #[serde(rename = "środa")]
  Wednesday,
  #[serde(rename = "czwartek")]
  Thursday,
  #[serde(rename = "piątek")]
  Friday,
  #[serde(rename = "sobota")]
  Saturday,
  #[serde(rename = "niedziela")]
  Sunday,
}

impl TrainingDay {
  /// Monday-first rotation
  pub const ALL: [TrainingDay; 7] = [
    TrainingDay::Monday,
    TrainingDay::Tuesday,
    TrainingDay::Wednesday,
    TrainingDay::Thursday,
    TrainingDay::Friday,
    TrainingDay::Saturday,
    TrainingDay::Sunday,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      TrainingDay::Monday => "poniedziałek",
      TrainingDay::Tuesday => "wtorek",
      TrainingDay::Wednesday => "środa",
      TrainingDay::Thursday => "czwartek",
      TrainingDay::Friday => "piątek",
      TrainingDay::Saturday => "sobota",
      TrainingDay::Sunday => "niedziela",
    }
  }

  /// Days since Monday (0..=6)
  pub fn offset(&self) -> u32 {
    match self {
      TrainingDay::Monday => 0,
      TrainingDay::Tuesday => 1,
      TrainingDay::Wednesday => 2,
      TrainingDay::Thursday => 3,
      TrainingDay::Friday => 4,
      TrainingDay::Saturday => 5,
      TrainingDay::Sunday => 6,
    }
  }

  pub fn from_position(position: usize) -> Self {
    Self::ALL[position % 7]
  }

  pub fn from_chrono(weekday: chrono::Weekday) -> Self {
    Self::ALL[weekday.num_days_from_monday() as usize]
  }

  /// Lenient lookup used when repairing model output
  pub fn parse_lenient(raw: &str) -> Option<Self> {
    let folded: String = raw
      .trim()
      .to_lowercase()
      .chars()
      .map(|c| match c {
        'ą' => 'a',
        'ć' => 'c',
        'ę' => 'e',
        'ł' => 'l',
        'ń' => 'n',
        'ó' => 'o',
        'ś' => 's',
        'ź' | 'ż' => 'z',
        other => other,
      })
      .filter(|c| c.is_alphabetic())
      .collect();

    let day = match folded.as_str() {
      "poniedzialek" | "pon" | "pn" | "monday" | "mon" => TrainingDay::Monday,
      "wtorek" | "wt" | "tuesday" | "tue" | "tues" => TrainingDay::Tuesday,
      "sroda" | "sr" | "wednesday" | "wed" => TrainingDay::Wednesday,
      "czwartek" | "czw" | "cz" | "thursday" | "thu" | "thurs" => TrainingDay::Thursday,
      "piatek" | "pt" | "pia" | "friday" | "fri" => TrainingDay::Friday,
      "sobota" | "sob" | "so" | "saturday" | "sat" => TrainingDay::Saturday,
      "niedziela" | "nd" | "niedz" | "ndz" | "sunday" | "sun" => TrainingDay::Sunday,
      _ => return None,
    };
    Some(day)
  }
}

impl std::fmt::Display for TrainingDay {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl std::str::FromStr for TrainingDay {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse_lenient(s).ok_or_else(|| format!("Unknown weekday: {}", s))
  }
}

impl<'de> Deserialize<'de> for TrainingDay {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
  }
}

/// ---------------------------------------------------------------------------
/// Goals and Levels
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum ExperienceLevel {
  #[default]
  Beginner,
  Intermediate,
  Advanced,
}

impl ExperienceLevel {
  pub fn as_str(&self) -> &'static str {
    match self {
      ExperienceLevel::Beginner => "beginner",
      ExperienceLevel::Intermediate => "intermediate",
      ExperienceLevel::Advanced => "advanced",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum MainGoal {
  /// First steps in running
  StartRunning,
  #[default]
  ImproveFitness,
  WeightLoss,
  /// Finish a given distance
  RunDistance,
  /// Run a given distance faster
  ImprovePace,
  ReturnAfterBreak,
}

impl MainGoal {
  pub fn as_str(&self) -> &'static str {
    match self {
      MainGoal::StartRunning => "start running",
      MainGoal::ImproveFitness => "improve fitness",
      MainGoal::WeightLoss => "weight loss",
      MainGoal::RunDistance => "complete a distance",
      MainGoal::ImprovePace => "improve race pace",
      MainGoal::ReturnAfterBreak => "return after a break",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetDistance {
  #[serde(rename = "5k")]
  FiveK,
  #[serde(rename = "10k")]
  TenK,
  #[serde(rename = "half_marathon")]
  HalfMarathon,
  #[serde(rename = "marathon")]
  Marathon,
}

impl TargetDistance {
  pub fn as_str(&self) -> &'static str {
    match self {
      TargetDistance::FiveK => "5k",
      TargetDistance::TenK => "10k",
      TargetDistance::HalfMarathon => "half_marathon",
      TargetDistance::Marathon => "marathon",
    }
  }

  pub fn km(&self) -> f64 {
    match self {
      TargetDistance::FiveK => 5.0,
      TargetDistance::TenK => 10.0,
      TargetDistance::HalfMarathon => 21.0975,
      TargetDistance::Marathon => 42.195,
    }
  }
}

/// ---------------------------------------------------------------------------
/// User Profile
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HealthInfo {
  #[serde(default)]
  pub has_injuries: bool,
  #[serde(default)]
  pub injury_description: Option<String>,
  #[serde(default)]
  pub conditions: Vec<String>,
  #[serde(default)]
  pub medications: Vec<String>,
}

impl HealthInfo {
  pub fn is_clear(&self) -> bool {
    !self.has_injuries && self.conditions.is_empty() && self.medications.is_empty()
  }
}

/// Per-request runner profile. Dates stay raw strings so a malformed optional
/// date can be reported in the prompt instead of failing the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  #[serde(default)]
  pub name: Option<String>,
  pub age: u32,
  #[serde(default)]
  pub experience_level: ExperienceLevel,
  #[serde(default)]
  pub main_goal: MainGoal,
  #[serde(default)]
  pub target_distance: Option<TargetDistance>,
  /// Current weekly volume in km
  #[serde(default)]
  pub weekly_mileage_km: f64,
  /// Ordered, unique; its length is the number of training days per week
  #[serde(default)]
  pub training_days: Vec<TrainingDay>,
  #[serde(default)]
  pub health: HealthInfo,
  #[serde(default)]
  pub resting_hr: Option<u32>,
  #[serde(default)]
  pub max_hr: Option<u32>,
  /// Distance covered in a 12-minute Cooper test, in meters
  #[serde(default)]
  pub cooper_distance_m: Option<f64>,
  /// Preferred plan length in weeks
  #[serde(default)]
  pub duration_weeks_hint: Option<u32>,
  #[serde(default)]
  pub start_date: Option<String>,
  #[serde(default)]
  pub race_date: Option<String>,
}

impl UserProfile {
  pub fn days_per_week(&self) -> usize {
    self.training_days.len()
  }

  /// Training days with duplicates removed, first occurrence wins
  pub fn unique_training_days(&self) -> Vec<TrainingDay> {
    let mut seen = Vec::with_capacity(self.training_days.len());
    for day in &self.training_days {
      if !seen.contains(day) {
        seen.push(*day);
      }
    }
    seen
  }
}
