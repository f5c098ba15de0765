use jiff::{SignedDuration, Timestamp};

use crate::problem::{
    location::LocationIdx, stop::Stop, vehicle::Vehicle,
    vehicle_routing_problem::VehicleRoutingProblem,
};

/// `timestamp - duration`, clamped to `Timestamp::MIN`.
pub(crate) fn saturating_sub(timestamp: Timestamp, duration: SignedDuration) -> Timestamp {
    timestamp.checked_sub(duration).unwrap_or(Timestamp::MIN)
}

/// `timestamp + duration`, clamped to `Timestamp::MAX`.
///
/// A clamped time is never on time, see `is_on_time`.
pub(crate) fn saturating_add(timestamp: Timestamp, duration: SignedDuration) -> Timestamp {
    timestamp.checked_add(duration).unwrap_or(Timestamp::MAX)
}

/// `time <= latest` for a time that did not overflow.
pub(crate) fn is_on_time(time: Timestamp, latest: Timestamp) -> bool {
    time < Timestamp::MAX && time <= latest
}

/// The vehicle leaves its depot late enough to never wait at its first stop.
pub(crate) fn compute_first_arrival_time(
    problem: &VehicleRoutingProblem,
    vehicle: &Vehicle,
    stop: &Stop,
) -> Timestamp {
    let travel_time = problem.travel_time(vehicle.start_location_id(), stop.location_id());
    let earliest_arrival = saturating_add(vehicle.earliest_start_time(), travel_time);

    match stop.time_window().start() {
        Some(start) => earliest_arrival.max(start),
        None => earliest_arrival,
    }
}

pub(crate) fn compute_arrival_time(
    problem: &VehicleRoutingProblem,
    previous_location_id: LocationIdx,
    previous_departure_time: Timestamp,
    stop: &Stop,
) -> Timestamp {
    saturating_add(
        previous_departure_time,
        problem.travel_time(previous_location_id, stop.location_id()),
    )
}

pub(crate) fn compute_waiting_duration(stop: &Stop, arrival_time: Timestamp) -> SignedDuration {
    stop.time_window().waiting_duration(arrival_time)
}

pub(crate) fn compute_departure_time(stop: &Stop, arrival_time: Timestamp) -> Timestamp {
    let waiting_duration = compute_waiting_duration(stop, arrival_time);
    saturating_add(saturating_add(arrival_time, waiting_duration), stop.duration())
}

pub(crate) fn compute_vehicle_start(
    problem: &VehicleRoutingProblem,
    vehicle: &Vehicle,
    first_stop: &Stop,
    first_arrival_time: Timestamp,
) -> Timestamp {
    saturating_sub(
        first_arrival_time,
        problem.travel_time(vehicle.start_location_id(), first_stop.location_id()),
    )
}

pub(crate) fn compute_vehicle_end(
    problem: &VehicleRoutingProblem,
    vehicle: &Vehicle,
    last_location_id: LocationIdx,
    last_departure_time: Timestamp,
) -> Timestamp {
    match vehicle.end_location_id() {
        Some(end_location_id) => {
            saturating_add(
                last_departure_time,
                problem.travel_time(last_location_id, end_location_id),
            )
        }
        None => last_departure_time,
    }
}

/// Latest departure from `location_id` that still ends the route within the shift.
pub(crate) fn compute_latest_final_departure(
    problem: &VehicleRoutingProblem,
    vehicle: &Vehicle,
    location_id: LocationIdx,
) -> Timestamp {
    match (vehicle.latest_end_time(), vehicle.end_location_id()) {
        (Some(latest_end), Some(end_location_id)) => saturating_sub(
            latest_end,
            problem.travel_time(location_id, end_location_id),
        ),
        (Some(latest_end), None) => latest_end,
        (None, _) => Timestamp::MAX,
    }
}

/// Latest arrival at `stop` keeping it and everything after it feasible.
///
/// `next` is the location and latest arrival of the following stop, `None` when
/// `stop` is the last one of the route.
pub(crate) fn compute_latest_arrival_time(
    problem: &VehicleRoutingProblem,
    vehicle: &Vehicle,
    stop: &Stop,
    next: Option<(LocationIdx, Timestamp)>,
) -> Timestamp {
    let latest_departure = match next {
        Some((next_location_id, next_latest_arrival)) => saturating_sub(
            next_latest_arrival,
            problem.travel_time(stop.location_id(), next_location_id),
        ),
        None => compute_latest_final_departure(problem, vehicle, stop.location_id()),
    };

    let latest_arrival = stop
        .time_window()
        .latest()
        .min(saturating_sub(latest_departure, stop.duration()));

    // Waiting for the window to open already makes the vehicle too late
    match stop.time_window().start() {
        Some(start) if start > latest_arrival => Timestamp::MIN,
        _ => latest_arrival,
    }
}
