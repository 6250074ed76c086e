// Congestion
pub const DEFAULT_CONGESTION_THRESHOLD: u32 = 10;
pub const DEFAULT_WEIGHT_DIVISOR: u32 = 10;

// Signal timings (seconds)
pub const DEFAULT_BASE_GREEN_SECS: u32 = 30;
pub const DEFAULT_SIGNAL_SCALE_FACTOR: u32 = 5;
pub const DEFAULT_EMERGENCY_GREEN_SECS: u32 = 60;

// Input files read by the console binary
pub const FILE_ROAD_NETWORK: &str = "road_network.csv";
pub const FILE_CLOSURES: &str = "accidents_or_closures.csv";
pub const FILE_EMERGENCY_VEHICLES: &str = "emergency_vehicles.csv";
pub const FILE_SIGNAL_TIMINGS: &str = "traffic_signal_timings.csv";
pub const FILE_VEHICLES: &str = "vehicles.csv";
pub const FILE_TRAFFIC_UPDATES: &str = "traffic_updates.csv";
pub const FILE_CONFIG: &str = "config.json";
