pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# LOGGW CONFIGURATION
# =============================================================================
# Log gateway in front of the supervisor API and the local Home Assistant log
# files. Values of the form $env{NAME} are read from the environment.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/loggw/config.yml
#   3. /etc/loggw/config.yml

web:
  listen: 0.0.0.0:8099

# Token clients must send as "Authorization: Bearer <token>"
auth:
  token: $env{LOGGW_TOKEN}

upstream:
  base_url: http://supervisor
  token: $env{SUPERVISOR_TOKEN}
  connect_timeout: 2s
  read_timeout: 6s
  # Ask the supervisor to strip ANSI colors
  no_colors: true

lines:
  # Used when a request has no ?lines= parameter
  default: 1000
  # Requests above this are rejected
  max: 1000

z2m:
  slug: 45df7312_zigbee2mqtt
  # Largest window requested while looking for non-debug lines (>= 1000)
  fetch_cap: 20000

paths:
  config_dir: /config
  all_addon_configs_dir: /all_addon_configs

# Rotated core log files, newest first. Relative paths live under config_dir.
core_log:
  files:
    - home-assistant.log
    - home-assistant.log.1
    - home-assistant.log.2
"#
    .to_string()
}
