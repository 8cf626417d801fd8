//! # Moteur de décision — politique et escalade
//!
//! Mappe (décision, confiance, sévérité, historique utilisateur) vers une
//! action exécutable. Les seuils et les ensembles d'actions par sévérité
//! sont des tables de données; l'escalade monte d'un cran au-delà de
//! cinq violations antérieures.

pub mod actions;
pub mod routes;
pub mod store;

use crate::models::{ActionType, ModerationDecision, Severity};

/// Seuils de confiance par action, évalués du plus grave au plus doux
pub const ACTION_THRESHOLDS: &[(ActionType, f64)] = &[
    (ActionType::Ban, 0.9),
    (ActionType::Kick, 0.8),
    (ActionType::Timeout, 0.6),
    (ActionType::Warn, 0.3),
];

/// Actions autorisées par niveau de sévérité
pub fn allowed_actions(severity: Severity) -> &'static [ActionType] {
    match severity {
        Severity::Low => &[ActionType::Warn],
        Severity::Medium => &[ActionType::Warn, ActionType::Timeout],
        Severity::High => &[ActionType::Timeout, ActionType::Kick],
        Severity::Critical => &[ActionType::Kick, ActionType::Ban],
    }
}

/// Nombre de violations au-delà duquel l'escalade se déclenche
pub const ESCALATION_THRESHOLD: i32 = 5;

/// Action de base: la première action du barème autorisée par la
/// sévérité et dont le seuil de confiance est atteint
pub fn base_action(confidence: f64, severity: Severity) -> ActionType {
    let available = allowed_actions(severity);

    for (action, threshold) in ACTION_THRESHOLDS {
        if available.contains(action) && confidence >= *threshold {
            return *action;
        }
    }

    ActionType::Warn
}

/// Escalade d'un cran: warn→timeout→kick→ban→ban
pub fn escalate_action(action: ActionType) -> ActionType {
    match action {
        ActionType::None => ActionType::None,
        ActionType::Warn => ActionType::Timeout,
        ActionType::Timeout => ActionType::Kick,
        ActionType::Kick => ActionType::Ban,
        ActionType::Ban => ActionType::Ban,
    }
}

/// Détermine l'action finale pour une décision, compte tenu de
/// l'historique de violations de l'utilisateur
pub fn determine_action(decision: &ModerationDecision, violation_count: i32) -> ActionType {
    let action = base_action(decision.confidence, decision.severity);

    if violation_count > ESCALATION_THRESHOLD {
        let escalated = escalate_action(action);
        tracing::info!(
            user_id = %decision.user_id,
            violation_count = violation_count,
            base_action = %action,
            escalated_action = %escalated,
            "📈 Escalade d'action (récidiviste)"
        );
        return escalated;
    }

    action
}
