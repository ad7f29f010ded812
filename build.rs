use std::{env, error::Error, fs, path::Path};

use serde::Deserialize;

#[derive(Deserialize)]
struct RawConfig {
    device_id: String,
    wifi_ssid: String,
    wifi_psk: String,
    mqtt_hostname: String,
    mqtt_port: u16,
    mqtt_lastwill_topic: String,
    mqtt_pub_topic: String,
    mqtt_sub_topic: String,
    secret_key: String,
    tls_ca: Option<String>,
    tls_cert: Option<String>,
    tls_key: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Tell Cargo to rerun if toml changes
    println!("cargo:rerun-if-changed=cfg.toml");

    // Read and parse
    let toml_str = fs::read_to_string("cfg.toml")?;
    let raw: RawConfig = toml::from_str(&toml_str)?;

    // Generate Rust code
    let out_dir = env::var("OUT_DIR")?;
    let dest_path = Path::new(&out_dir).join("config.rs");
    let code = format!(
        r#"
        pub const CONFIG: Config = Config {{
            device_id: {id:?},
            wifi_ssid: {ssid:?},
            wifi_psk: {psk:?},
            mqtt_hostname: {mh:?},
            mqtt_port: {mp},
            mqtt_lastwill_topic: {lw:?},
            mqtt_pub_topic: {pt:?},
            mqtt_sub_topic: {st:?},
            secret_key: {sk:?},
            tls_ca: {ca:?},
            tls_cert: {cert:?},
            tls_key: {key:?},
        }};
    "#,
        id = raw.device_id,
        ssid = raw.wifi_ssid,
        psk = raw.wifi_psk,
        mh = raw.mqtt_hostname,
        mp = raw.mqtt_port,
        lw = raw.mqtt_lastwill_topic,
        pt = raw.mqtt_pub_topic,
        st = raw.mqtt_sub_topic,
        sk = raw.secret_key,
        ca = raw.tls_ca,
        cert = raw.tls_cert,
        key = raw.tls_key
    );

    fs::write(dest_path, code)?;
    Ok(())
}
