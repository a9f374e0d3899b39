use crate::topic::{PriorityTier, Topic};

/// Builds the justification attached to every allocation decision.
pub struct ReasoningAnnotator {
    total_budget_minutes: u32,
    min_minutes_per_topic: u32,
}

/// Everything the annotator needs to explain one session.
pub struct SessionContext<'a> {
    pub topic: &'a Topic,
    pub priority: f64,
    pub topic_minutes: u32,
    pub session_minutes: u32,
    pub part: u32,
    pub previous_day: Option<u32>,
    pub capped: bool,
    pub prerequisite_names: &'a [String],
}

impl ReasoningAnnotator {
    pub fn new(total_budget_minutes: u32, min_minutes_per_topic: u32) -> Self {
        Self {
            total_budget_minutes,
            min_minutes_per_topic,
        }
    }

    pub fn session_reason(&self, ctx: &SessionContext<'_>) -> String {
        let tier = PriorityTier::from_score(ctx.priority);
        let mut reason = format!(
            "{} priority ({:.4}): {}; {} of {} min total ({:.1}% of budget)",
            tier,
            ctx.priority,
            Self::describe_signals(ctx.topic),
            ctx.topic_minutes,
            self.total_budget_minutes,
            self.share_percent(ctx.topic_minutes)
        );
        if ctx.capped {
            reason.push_str("; capped at the per-topic maximum");
        } else if ctx.topic_minutes <= self.min_minutes_per_topic {
            reason.push_str("; guaranteed minimum coverage");
        }
        if ctx.part > 1 {
            match ctx.previous_day {
                Some(day) => reason.push_str(&format!(
                    "; part {} ({} min), continued from day {}",
                    ctx.part, ctx.session_minutes, day
                )),
                None => reason.push_str(&format!(
                    "; part {} ({} min)",
                    ctx.part, ctx.session_minutes
                )),
            }
        } else if ctx.session_minutes < ctx.topic_minutes {
            reason.push_str(&format!(
                "; part 1 ({} min), continues next day",
                ctx.session_minutes
            ));
        }
        if !ctx.prerequisite_names.is_empty() {
            reason.push_str(&format!(
                "; after prerequisite {}",
                ctx.prerequisite_names.join(", ")
            ));
        }
        reason
    }

    pub fn deferred_reason(&self, topic: &Topic, priority: f64, kept: usize) -> String {
        format!(
            "deferred, {} priority ({:.4}): {}; the {} min budget covers the {} min minimum for only the top {} topic(s)",
            PriorityTier::from_score(priority),
            priority,
            Self::describe_signals(topic),
            self.total_budget_minutes,
            self.min_minutes_per_topic,
            kept
        )
    }

    fn share_percent(&self, minutes: u32) -> f64 {
        if self.total_budget_minutes == 0 {
            return 0.0;
        }
        f64::from(minutes) * 100.0 / f64::from(self.total_budget_minutes)
    }

    fn describe_signals(topic: &Topic) -> String {
        let asked = match topic.frequency_count {
            0 => "not seen in PYQs".to_string(),
            1 => "asked once in PYQs".to_string(),
            n => format!("asked {n} times in PYQs"),
        };
        let mut parts = vec![asked, format!("{} marks", topic.marks_weight)];
        if let Some(year) = topic.last_asked_year {
            parts.push(format!("last asked {year}"));
        }
        parts.join(", ")
    }
}
