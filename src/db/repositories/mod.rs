mod daily_logs;
mod exercise_library;
mod photos;
mod plans;
mod profiles;
mod published_plans;
mod weight_logs;
mod workout_days;
