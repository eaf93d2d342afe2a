// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event handlers for sessions, steps, assignments, and the event feed.

use super::MaterializedState;
use remedy_core::{Event, SessionStatus};

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::SessionCreated { session } => {
            if !state.sessions.contains_key(&session.id) {
                state.sessions.insert(session.id, session.clone());
            }
        }

        Event::SessionStarted { id, started_at_ms } => {
            if let Some(session) = state.sessions.get_mut(id) {
                if session.started_at_ms.is_none() {
                    session.started_at_ms = Some(*started_at_ms);
                }
                if session.status == SessionStatus::Pending {
                    session.status = SessionStatus::InProgress;
                }
            }
        }

        Event::SessionStatusChanged { id, status, completed_at_ms, total_duration_minutes } => {
            if let Some(session) = state.sessions.get_mut(id) {
                session.status = *status;
                if let Some(completed_at_ms) = completed_at_ms {
                    session.completed_at_ms = Some(*completed_at_ms);
                }
                if let Some(minutes) = total_duration_minutes {
                    session.total_duration_minutes = Some(*minutes);
                }
                if status.is_terminal() {
                    session.waiting_for_approval = false;
                    session.approval_step_number = None;
                    session.paused_status = None;
                }
            }
        }

        Event::SessionPaused { id, prior } => {
            if let Some(session) = state.sessions.get_mut(id) {
                if session.status != SessionStatus::Paused {
                    session.paused_status = Some(*prior);
                    session.status = SessionStatus::Paused;
                }
            }
        }

        Event::SessionResumed { id, status } => {
            if let Some(session) = state.sessions.get_mut(id) {
                session.status = *status;
                session.paused_status = None;
                session.waiting_for_approval = *status == SessionStatus::WaitingApproval;
            }
        }

        Event::CurrentStepSet { id, step_number } => {
            if let Some(session) = state.sessions.get_mut(id) {
                session.current_step = Some(*step_number);
            }
        }

        Event::ApprovalRequested { id, step_number } => {
            if let Some(session) = state.sessions.get_mut(id) {
                session.status = SessionStatus::WaitingApproval;
                session.waiting_for_approval = true;
                session.approval_step_number = Some(*step_number);
                session.current_step = Some(*step_number);
            }
        }

        Event::ApprovalCleared { id } => {
            if let Some(session) = state.sessions.get_mut(id) {
                session.waiting_for_approval = false;
                session.approval_step_number = None;
                if session.status == SessionStatus::WaitingApproval {
                    session.status = SessionStatus::InProgress;
                }
            }
        }

        Event::ApprovalRecorded { id, step_number, approved, approved_by, approved_at_ms } => {
            if let Some(session) = state.sessions.get_mut(id) {
                if let Some(step) = session.step_mut(*step_number) {
                    if step.approved.is_none() {
                        step.approved = Some(*approved);
                        step.approved_by = approved_by.clone();
                        step.approved_at_ms = Some(*approved_at_ms);
                    }
                }
            }
        }

        Event::StepCompleted {
            id,
            step_number,
            success,
            output,
            error,
            notes,
            credentials_used,
            completed_at_ms,
        } => {
            if let Some(session) = state.sessions.get_mut(id) {
                if let Some(step) = session.step_mut(*step_number) {
                    if !step.completed {
                        step.completed = true;
                        step.success = Some(*success);
                        step.output = output.clone();
                        step.error = error.clone();
                        step.notes = notes.clone();
                        step.credentials_used = credentials_used.clone();
                        step.completed_at_ms = Some(*completed_at_ms);
                    }
                }
            }
        }

        Event::FeedbackRecorded { id, feedback } => {
            if let Some(session) = state.sessions.get_mut(id) {
                session.feedback = Some(feedback.clone());
            }
        }

        Event::EventRecorded { event } => {
            let events = state.events.entry(event.session_id).or_default();
            let duplicate =
                events.iter().any(|e| e.id == event.id || e.stream_id == event.stream_id);
            if !duplicate {
                events.push(event.clone());
            }
            if let Some(session) = state.sessions.get_mut(&event.session_id) {
                session.last_event_seq = Some(event.stream_id.clone());
            }
        }

        Event::AssignmentRecorded { assignment } => {
            let assignments = state.assignments.entry(assignment.session_id).or_default();
            if !assignments.iter().any(|a| a.id == assignment.id) {
                assignments.push(assignment.clone());
            }
        }

        Event::AssignmentStatusChanged {
            session_id,
            assignment_id,
            status,
            worker_id,
            acknowledged_at_ms,
        } => {
            if let Some(assignments) = state.assignments.get_mut(session_id) {
                if let Some(assignment) =
                    assignments.iter_mut().find(|a| a.id == *assignment_id)
                {
                    assignment.status = *status;
                    if worker_id.is_some() {
                        assignment.worker_id = worker_id.clone();
                    }
                    if acknowledged_at_ms.is_some() {
                        assignment.acknowledged_at_ms = *acknowledged_at_ms;
                    }
                }
            }
        }

        Event::AssignmentDetailsUpdated { session_id, assignment_id, details } => {
            if let Some(assignments) = state.assignments.get_mut(session_id) {
                if let Some(assignment) =
                    assignments.iter_mut().find(|a| a.id == *assignment_id)
                {
                    assignment.details = details.clone();
                }
            }
        }

        _ => {}
    }
}
