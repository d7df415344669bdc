use alloc::boxed::Box;
use esp_hal::{
    peripherals::{RADIO_CLK, WIFI},
    rng::Rng,
    timer::timg,
};
use esp_wifi::{
    esp_now::{EspNowError, EspNowManager, EspNowReceiver, EspNowSender, EspNowWifiInterface, PeerInfo},
    wifi::WifiMode,
};

use climate_node::{
    config::ESPNOW_CHANNEL, error::ConfigurationError, error::LinkError, peer::PeerAddress,
    task::transport::WirelessLink,
};

pub struct EspNowLink {
    manager: EspNowManager<'static>,
    sender: EspNowSender<'static>,
}

/// Brings up the radio in station mode on the ESP-NOW channel and registers
/// the peer.
pub fn init(
    timer: timg::Timer<'static>,
    rng: Rng,
    radio_clk: RADIO_CLK<'static>,
    wifi: WIFI<'static>,
    peer: PeerAddress,
) -> Result<(EspNowLink, EspNowReceiver<'static>), ConfigurationError> {
    let radio = Box::leak(Box::new(
        esp_wifi::init(timer, rng, radio_clk).map_err(|_| ConfigurationError::Peripheral("radio"))?,
    ));

    let (controller, interfaces) =
        esp_wifi::wifi::new(radio, wifi).map_err(|_| ConfigurationError::Peripheral("wifi"))?;
    // The controller must outlive every ESP-NOW handle.
    let controller = Box::leak(Box::new(controller));
    controller
        .set_mode(WifiMode::Sta)
        .and_then(|()| controller.start())
        .map_err(|_| ConfigurationError::Peripheral("wifi station"))?;

    let esp_now = interfaces.esp_now;
    esp_now
        .set_channel(ESPNOW_CHANNEL)
        .map_err(|_| ConfigurationError::Peripheral("esp-now channel"))?;
    let (manager, sender, receiver) = esp_now.split();

    let link = EspNowLink { manager, sender };
    link.add_peer(peer)?;

    Ok((link, receiver))
}

impl EspNowLink {
    fn add_peer(&self, peer: PeerAddress) -> Result<(), ConfigurationError> {
        if self.manager.peer_exists(peer.as_bytes()) {
            return Ok(());
        }

        self.manager
            .add_peer(PeerInfo {
                interface: EspNowWifiInterface::Sta,
                peer_address: *peer.as_bytes(),
                lmk: None,
                channel: None,
                encrypt: false,
            })
            .map_err(|_| ConfigurationError::Peripheral("esp-now peer"))
    }
}

impl WirelessLink for EspNowLink {
    async fn send_frame(&mut self, peer: &PeerAddress, frame: &[u8]) -> Result<(), LinkError> {
        self.sender
            .send_async(peer.as_bytes(), frame)
            .await
            .map_err(|error| match error {
                EspNowError::SendFailed => LinkError::NotDelivered,
                _ => LinkError::NotAccepted,
            })
    }
}
