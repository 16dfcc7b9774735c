mod entropy_quality;
mod mlock_verification;
mod secret_masking;
