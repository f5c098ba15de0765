use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};

use crate::problem::{
    location::LocationIdx,
    stop::StopIdx,
    travel_cost_matrix::{Cost, Distance},
    vehicle::{Vehicle, VehicleIdx},
    vehicle_routing_problem::VehicleRoutingProblem,
};

use super::utils::{
    compute_arrival_time, compute_departure_time, compute_first_arrival_time,
    compute_latest_arrival_time, compute_latest_final_departure, compute_vehicle_end,
    compute_vehicle_start, compute_waiting_duration, is_on_time,
};

#[derive(Clone)]
pub struct WorkingSolutionRoute {
    pub(super) vehicle_id: VehicleIdx,

    // Map of StopIdx to its position in stop_ids
    pub(super) positions: FxHashMap<StopIdx, usize>,

    /// Stops in visiting order
    pub(super) stop_ids: Vec<StopIdx>,

    pub(super) arrival_times: Vec<Timestamp>,
    pub(super) departure_times: Vec<Timestamp>,
    pub(super) waiting_durations: Vec<SignedDuration>,

    // fwd_loads[i] is the demand of the stops [0, i]
    pub(super) fwd_loads: Vec<f64>,

    // latest_arrivals[i] is the latest arrival at stop i that keeps stop i and
    // every following stop (and the return to the depot) feasible.
    // Computed backward from the end of the route.
    pub(super) latest_arrivals: Vec<Timestamp>,

    // fwd_costs[i] is the cost of the arcs from stop 0 to stop i,
    // bwd_costs[i] the cost of the same arcs travelled from stop i back to stop 0
    pub(super) fwd_costs: Vec<Cost>,
    pub(super) bwd_costs: Vec<Cost>,

    cost: Cost,
    distance: Distance,
}

impl WorkingSolutionRoute {
    pub fn empty(vehicle_id: VehicleIdx) -> Self {
        WorkingSolutionRoute {
            vehicle_id,
            positions: FxHashMap::default(),
            stop_ids: Vec::new(),
            arrival_times: Vec::new(),
            departure_times: Vec::new(),
            waiting_durations: Vec::new(),
            fwd_loads: Vec::new(),
            latest_arrivals: Vec::new(),
            fwd_costs: Vec::new(),
            bwd_costs: Vec::new(),
            cost: 0.0,
            distance: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.stop_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_ids.is_empty()
    }

    pub fn vehicle_id(&self) -> VehicleIdx {
        self.vehicle_id
    }

    pub fn vehicle<'a>(&self, problem: &'a VehicleRoutingProblem) -> &'a Vehicle {
        problem.vehicle(self.vehicle_id)
    }

    pub fn stop_ids(&self) -> &[StopIdx] {
        &self.stop_ids
    }

    pub fn stop_id(&self, position: usize) -> StopIdx {
        self.stop_ids[position]
    }

    /// Stop IDs in the `[start, end)` positions
    pub fn stop_ids_iter(
        &self,
        start: usize,
        end: usize,
    ) -> impl DoubleEndedIterator<Item = StopIdx> + Clone + '_ {
        self.stop_ids[start..end].iter().copied()
    }

    /// Random position of a non-empty route.
    pub fn random_position<R>(&self, rng: &mut R) -> usize
    where
        R: rand::Rng,
    {
        rng.random_range(0..self.stop_ids.len())
    }

    pub fn contains_stop(&self, stop_id: StopIdx) -> bool {
        self.positions.contains_key(&stop_id)
    }

    pub fn stop_position(&self, stop_id: StopIdx) -> Option<usize> {
        self.positions.get(&stop_id).copied()
    }

    pub fn arrival_time(&self, position: usize) -> Timestamp {
        self.arrival_times[position]
    }

    pub fn departure_time(&self, position: usize) -> Timestamp {
        self.departure_times[position]
    }

    pub fn waiting_duration(&self, position: usize) -> SignedDuration {
        self.waiting_durations[position]
    }

    pub fn latest_arrival_time(&self, position: usize) -> Timestamp {
        self.latest_arrivals[position]
    }

    /// Demand delivered up to and including `position`.
    pub fn load_at(&self, position: usize) -> f64 {
        self.fwd_loads[position]
    }

    pub fn total_load(&self) -> f64 {
        self.fwd_loads.last().copied().unwrap_or(0.0)
    }

    /// Demand of the stops in the `[start, end)` positions
    pub fn segment_load(&self, start: usize, end: usize) -> f64 {
        if start >= end {
            return 0.0;
        }

        let before = if start > 0 {
            self.fwd_loads[start - 1]
        } else {
            0.0
        };

        self.fwd_loads[end - 1] - before
    }

    /// Cost of the arcs between the stops at `start` and `end`, in route order.
    pub fn fwd_segment_cost(&self, start: usize, end: usize) -> Cost {
        self.fwd_costs[end] - self.fwd_costs[start]
    }

    /// Cost of the arcs between the stops at `start` and `end`, travelled from `end` to `start`.
    pub fn bwd_segment_cost(&self, start: usize, end: usize) -> Cost {
        self.bwd_costs[end] - self.bwd_costs[start]
    }

    pub fn cost(&self) -> Cost {
        self.cost
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Departure from the start depot, `None` for an empty route.
    pub fn start(&self, problem: &VehicleRoutingProblem) -> Option<Timestamp> {
        let &first = self.stop_ids.first()?;
        Some(compute_vehicle_start(
            problem,
            self.vehicle(problem),
            problem.stop(first),
            self.arrival_times[0],
        ))
    }

    /// Arrival at the end depot, or departure from the last stop when the vehicle does not return.
    pub fn end(&self, problem: &VehicleRoutingProblem) -> Option<Timestamp> {
        let &last = self.stop_ids.last()?;
        Some(compute_vehicle_end(
            problem,
            self.vehicle(problem),
            problem.stop_location_id(last),
            self.departure_times[self.len() - 1],
        ))
    }

    pub fn duration(&self, problem: &VehicleRoutingProblem) -> SignedDuration {
        match (self.start(problem), self.end(problem)) {
            (Some(start), Some(end)) => end.duration_since(start),
            _ => SignedDuration::ZERO,
        }
    }

    pub fn location_id(&self, problem: &VehicleRoutingProblem, position: usize) -> LocationIdx {
        problem.stop_location_id(self.stop_ids[position])
    }

    /// Location visited right before `position`, the start depot for the first position.
    pub fn previous_location_id(
        &self,
        problem: &VehicleRoutingProblem,
        position: usize,
    ) -> LocationIdx {
        if position == 0 {
            self.vehicle(problem).start_location_id()
        } else {
            self.location_id(problem, position - 1)
        }
    }

    /// Location visited at `position`, the end depot (if any) past the last stop.
    pub fn location_or_end_id(
        &self,
        problem: &VehicleRoutingProblem,
        position: usize,
    ) -> Option<LocationIdx> {
        if position < self.len() {
            Some(self.location_id(problem, position))
        } else {
            self.vehicle(problem).end_location_id()
        }
    }

    /// Location visited right after `position`, the end depot (if any) after the last stop.
    pub fn next_location_id(
        &self,
        problem: &VehicleRoutingProblem,
        position: usize,
    ) -> Option<LocationIdx> {
        self.location_or_end_id(problem, position + 1)
    }

    /// Cost and distance added by inserting `stop_id` before `position`.
    pub fn insertion_delta(
        &self,
        problem: &VehicleRoutingProblem,
        stop_id: StopIdx,
        position: usize,
    ) -> (Cost, Distance) {
        let location_id = problem.stop_location_id(stop_id);
        let previous = self.previous_location_id(problem, position);
        let next = self.location_or_end_id(problem, position);

        let cost = problem.travel_cost(previous, location_id)
            + problem.travel_cost_or_zero(Some(location_id), next)
            - problem.travel_cost_or_zero(Some(previous), next);
        let distance = problem.travel_distance(previous, location_id)
            + problem.travel_distance_or_zero(Some(location_id), next)
            - problem.travel_distance_or_zero(Some(previous), next);

        (cost, distance)
    }

    /// How much the arrival at `stop_id`, inserted before `position`, could be delayed.
    ///
    /// Only meaningful for a feasible insertion.
    pub fn insertion_slack(
        &self,
        problem: &VehicleRoutingProblem,
        stop_id: StopIdx,
        position: usize,
    ) -> SignedDuration {
        let vehicle = self.vehicle(problem);
        let stop = problem.stop(stop_id);

        let arrival_time = if position == 0 {
            compute_first_arrival_time(problem, vehicle, stop)
        } else {
            compute_arrival_time(
                problem,
                self.location_id(problem, position - 1),
                self.departure_times[position - 1],
                stop,
            )
        };

        let next = (position < self.len()).then(|| {
            (
                self.location_id(problem, position),
                self.latest_arrivals[position],
            )
        });
        let latest_arrival_time = compute_latest_arrival_time(problem, vehicle, stop, next);

        latest_arrival_time.duration_since(arrival_time)
    }

    pub fn insert(&mut self, problem: &VehicleRoutingProblem, position: usize, stop_id: StopIdx) {
        if self.positions.contains_key(&stop_id) {
            return;
        }

        self.stop_ids.insert(position, stop_id);
        self.update_data(problem);
    }

    pub fn remove_at(&mut self, problem: &VehicleRoutingProblem, position: usize) -> Option<StopIdx> {
        if position >= self.stop_ids.len() {
            return None;
        }

        let stop_id = self.stop_ids.remove(position);
        self.update_data(problem);

        Some(stop_id)
    }

    pub fn remove_stop(&mut self, problem: &VehicleRoutingProblem, stop_id: StopIdx) -> bool {
        match self.stop_position(stop_id) {
            Some(position) => self.remove_at(problem, position).is_some(),
            None => false,
        }
    }

    /// Replaces the stops in the `[start, end)` positions with `stop_ids`.
    pub fn replace_stops(
        &mut self,
        problem: &VehicleRoutingProblem,
        stop_ids: &[StopIdx],
        start: usize,
        end: usize,
    ) {
        self.stop_ids.splice(start..end, stop_ids.iter().copied());
        self.update_data(problem);
    }

    pub fn reset(&mut self, problem: &VehicleRoutingProblem) {
        self.stop_ids.clear();
        self.update_data(problem);
    }

    pub fn is_valid_change(
        &self,
        problem: &VehicleRoutingProblem,
        stop_ids: impl Iterator<Item = StopIdx> + Clone,
        start: usize,
        end: usize,
    ) -> bool {
        self.is_valid_capacity_change(problem, stop_ids.clone(), start, end)
            && self.is_valid_tw_change(problem, stop_ids, start, end)
    }

    /// Checks the load after replacing the `[start, end)` positions with `stop_ids`.
    pub fn is_valid_capacity_change(
        &self,
        problem: &VehicleRoutingProblem,
        stop_ids: impl Iterator<Item = StopIdx>,
        start: usize,
        end: usize,
    ) -> bool {
        let added_load = stop_ids
            .map(|stop_id| problem.stop(stop_id).demand())
            .sum::<f64>();

        self.total_load() - self.segment_load(start, end) + added_load
            <= self.vehicle(problem).capacity()
    }

    /// Checks the time windows and the shift after replacing the `[start, end)` positions
    /// with `stop_ids`.
    ///
    /// The new stops are simulated one by one, the stops after `end` are only checked
    /// through the latest arrival of the first of them.
    pub fn is_valid_tw_change(
        &self,
        problem: &VehicleRoutingProblem,
        stop_ids: impl Iterator<Item = StopIdx>,
        start: usize,
        end: usize,
    ) -> bool {
        let vehicle = self.vehicle(problem);

        let mut previous = if start == 0 {
            None
        } else {
            Some((
                self.location_id(problem, start - 1),
                self.departure_times[start - 1],
            ))
        };

        for stop_id in stop_ids {
            let stop = problem.stop(stop_id);
            let arrival_time = match previous {
                Some((location_id, departure_time)) => {
                    compute_arrival_time(problem, location_id, departure_time, stop)
                }
                None => compute_first_arrival_time(problem, vehicle, stop),
            };

            if !stop.time_window().is_satisfied(arrival_time) {
                return false;
            }

            previous = Some((
                stop.location_id(),
                compute_departure_time(stop, arrival_time),
            ));
        }

        if end < self.len() {
            let next_stop = problem.stop(self.stop_ids[end]);
            let arrival_time = match previous {
                Some((location_id, departure_time)) => {
                    compute_arrival_time(problem, location_id, departure_time, next_stop)
                }
                None => compute_first_arrival_time(problem, vehicle, next_stop),
            };

            return is_on_time(arrival_time, self.latest_arrivals[end]);
        }

        match previous {
            Some((location_id, departure_time)) => {
                is_on_time(
                    departure_time,
                    compute_latest_final_departure(problem, vehicle, location_id),
                )
            }
            // The route becomes empty
            None => true,
        }
    }

    fn update_data(&mut self, problem: &VehicleRoutingProblem) {
        let vehicle = problem.vehicle(self.vehicle_id);
        let len = self.len();

        self.positions.clear();
        self.positions.extend(
            self.stop_ids
                .iter()
                .enumerate()
                .map(|(position, &stop_id)| (stop_id, position)),
        );

        self.arrival_times.clear();
        self.departure_times.clear();
        self.waiting_durations.clear();
        self.fwd_loads.clear();
        self.fwd_costs.clear();
        self.bwd_costs.clear();

        let mut load = 0.0;
        let mut fwd_cost = 0.0;
        let mut bwd_cost = 0.0;
        let mut distance = 0.0;
        let mut previous: Option<(LocationIdx, Timestamp)> = None;

        for position in 0..len {
            let stop = problem.stop(self.stop_ids[position]);

            let arrival_time = match previous {
                Some((location_id, departure_time)) => {
                    fwd_cost += problem.travel_cost(location_id, stop.location_id());
                    bwd_cost += problem.travel_cost(stop.location_id(), location_id);
                    distance += problem.travel_distance(location_id, stop.location_id());

                    compute_arrival_time(problem, location_id, departure_time, stop)
                }
                None => compute_first_arrival_time(problem, vehicle, stop),
            };
            let departure_time = compute_departure_time(stop, arrival_time);
            load += stop.demand();

            self.arrival_times.push(arrival_time);
            self.waiting_durations
                .push(compute_waiting_duration(stop, arrival_time));
            self.departure_times.push(departure_time);
            self.fwd_loads.push(load);
            self.fwd_costs.push(fwd_cost);
            self.bwd_costs.push(bwd_cost);

            previous = Some((stop.location_id(), departure_time));
        }

        self.latest_arrivals.clear();
        self.latest_arrivals.resize(len, Timestamp::MAX);
        let mut next = None;
        for position in (0..len).rev() {
            let stop = problem.stop(self.stop_ids[position]);
            let latest_arrival_time = compute_latest_arrival_time(problem, vehicle, stop, next);

            self.latest_arrivals[position] = latest_arrival_time;
            next = Some((stop.location_id(), latest_arrival_time));
        }

        if len == 0 {
            self.cost = 0.0;
            self.distance = 0.0;
        } else {
            let start_location_id = vehicle.start_location_id();
            let first_location_id = self.location_id(problem, 0);
            let last_location_id = self.location_id(problem, len - 1);
            let end_location_id = vehicle.end_location_id();

            self.cost = problem.travel_cost(start_location_id, first_location_id)
                + fwd_cost
                + problem.travel_cost_or_zero(Some(last_location_id), end_location_id);
            self.distance = problem.travel_distance(start_location_id, first_location_id)
                + distance
                + problem.travel_distance_or_zero(Some(last_location_id), end_location_id);
        }
    }
}
