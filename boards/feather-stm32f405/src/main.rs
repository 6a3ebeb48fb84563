#![deny(unsafe_code)]
#![no_main]
#![no_std]

#[cfg(all(feature = "sensor-report", feature = "resource-poll"))]
compile_error!("features `sensor-report` and `resource-poll` are mutually exclusive");

#[cfg(not(any(feature = "sensor-report", feature = "resource-poll")))]
compile_error!("enable one of the `sensor-report` or `resource-poll` features");

use coap_node_core::ConnectionMonitor;
use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod device_id;
mod eth;
mod heap;
mod network;
#[cfg(feature = "sensor-report")]
mod sensor;
mod usb;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// Connection state shared by the watcher, the worker and the heartbeat
static MONITOR: ConnectionMonitor = ConnectionMonitor::new();

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2, USART3])]
mod app {
    use super::*;
    use defmt::{error, info, warn, Display2Format};
    use embassy_futures::join::{join, join4};
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, Pull, Speed};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::rng::Rng;
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use embassy_time::Delay;
    use rand_core::RngCore;

    use coap_node_core::host::wait_for_host;
    use coap_node_core::{watch, CoapClient, NodeAction, NodeConfig, Worker};
    use network::{CoapSocket, EthLink, NetworkConfig, SocketBuffers, COAP_LOCAL_PORT};

    type SpiPeripheral = embassy_stm32::Peri<'static, peripherals::SPI2>;
    type PinPB13 = embassy_stm32::Peri<'static, peripherals::PB13>;
    type PinPB15 = embassy_stm32::Peri<'static, peripherals::PB15>;
    type PinPB14 = embassy_stm32::Peri<'static, peripherals::PB14>;
    type PinPC6 = embassy_stm32::Peri<'static, peripherals::PC6>;
    type PinPC3 = embassy_stm32::Peri<'static, peripherals::PC3>;
    type PinPC2 = embassy_stm32::Peri<'static, peripherals::PC2>;
    type ExtiChannel = embassy_stm32::Peri<'static, peripherals::EXTI2>;
    type DmaTx = embassy_stm32::Peri<'static, peripherals::DMA1_CH4>;
    type DmaRx = embassy_stm32::Peri<'static, peripherals::DMA1_CH3>;

    struct NetworkPeripherals {
        spi: SpiPeripheral,
        sck: PinPB13,
        mosi: PinPB15,
        miso: PinPB14,
        cs: PinPC6,
        reset: PinPC3,
        int: PinPC2,
        exti: ExtiChannel,
        dma_tx: DmaTx,
        dma_rx: DmaRx,
    }

    /// HTS221 on I2C1 (SCL PB6, SDA PB7)
    #[cfg_attr(feature = "resource-poll", allow(dead_code))]
    struct SensorPeripherals {
        i2c: embassy_stm32::Peri<'static, peripherals::I2C1>,
        scl: embassy_stm32::Peri<'static, peripherals::PB6>,
        sda: embassy_stm32::Peri<'static, peripherals::PB7>,
        dma_tx: embassy_stm32::Peri<'static, peripherals::DMA1_CH6>,
        dma_rx: embassy_stm32::Peri<'static, peripherals::DMA1_CH0>,
    }

    /// USB OTG FS (D+ PA12, D- PA11)
    struct UsbPeripherals {
        otg: embassy_stm32::Peri<'static, peripherals::USB_OTG_FS>,
        dp: embassy_stm32::Peri<'static, peripherals::PA12>,
        dm: embassy_stm32::Peri<'static, peripherals::PA11>,
    }

    embassy_stm32::bind_interrupts!(struct Irqs {
        RNG => embassy_stm32::rng::InterruptHandler<peripherals::RNG>;
        I2C1_EV => embassy_stm32::i2c::EventInterruptHandler<peripherals::I2C1>;
        I2C1_ER => embassy_stm32::i2c::ErrorInterruptHandler<peripherals::I2C1>;
        OTG_FS => embassy_stm32::usb::InterruptHandler<peripherals::USB_OTG_FS>;
    });

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("CoAP node starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        // VCO / DIVQ(7) = 48 MHz (USB and RNG)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);
        heap::init();

        info!("Device UID: {}", device_id::uid_hex());

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        let timer_clock_hz = 84_000_000;
        Mono::start(timer_clock_hz);

        let led = Output::new(p.PC1, Level::High, Speed::Low);

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };
        let sensor_periph = SensorPeripherals {
            i2c: p.I2C1,
            scl: p.PB6,
            sda: p.PB7,
            dma_tx: p.DMA1_CH6,
            dma_rx: p.DMA1_CH0,
        };
        let usb_periph = UsbPeripherals {
            otg: p.USB_OTG_FS,
            dp: p.PA12,
            dm: p.PA11,
        };

        heartbeat::spawn().ok();
        network_task::spawn(net_periph, sensor_periph, p.RNG).ok();
        usb_task::spawn(usb_periph).ok();

        (Shared {}, Local { led })
    }

    /// Heartbeat task: slow blink while attached, fast blink while not
    #[task(priority = 1, local = [led])]
    async fn heartbeat(cx: heartbeat::Context) {
        loop {
            let off_ms: u64 = if MONITOR.is_connected() { 1900 } else { 400 };
            cx.local.led.set_high();
            Mono::delay(100.millis()).await;
            cx.local.led.set_low();
            Mono::delay(off_ms.millis()).await;
        }
    }

    /// Network task: link, mesh watcher and CoAP worker
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn network_task(
        _cx: network_task::Context,
        periph: NetworkPeripherals,
        sensor_periph: SensorPeripherals,
        rng_periph: embassy_stm32::Peri<'static, peripherals::RNG>,
    ) {
        use embassy_net::StackResources;
        use static_cell::StaticCell;

        info!("Network task started");

        let config = node_config();
        if let Err(e) = config.validate() {
            error!("Invalid node configuration: {:?}", e);
            return;
        }
        info!(
            "CoAP peer [{}]:{}",
            Display2Format(config.peer.ip()),
            config.peer.port()
        );

        let mut rng = Rng::new(rng_periph, Irqs);
        let net_config = NetworkConfig {
            mac_addr: device_id::mac_address(),
            seed: rng.next_u64(),
        };

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );

        let eth_periph = eth::EthPeripherals {
            spi,
            cs: Output::new(periph.cs, Level::High, Speed::VeryHigh),
            reset: Output::new(periph.reset, Level::High, Speed::Low),
            int: ExtiInput::new(periph.int, periph.exti, Pull::Up),
        };

        let (device, w5500_runner) = match eth::init_w5500(eth_periph, net_config.mac_addr).await
        {
            Ok(parts) => parts,
            Err(e) => {
                error!("Ethernet bring-up failed: {}", e);
                return;
            }
        };

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            embassy_net::Config::default(),
            RESOURCES.init(StackResources::new()),
            net_config.seed,
        );
        let mut link = EthLink::new(stack, net_config.mesh_local_address());

        static SOCKET_BUFFERS: StaticCell<SocketBuffers> = StaticCell::new();
        let socket = match CoapSocket::bind(
            stack,
            SOCKET_BUFFERS.init(SocketBuffers::new()),
            COAP_LOCAL_PORT,
        ) {
            Ok(socket) => socket,
            Err(e) => {
                error!("CoAP socket unavailable: {}", e);
                return;
            }
        };
        let client = CoapClient::new(
            socket,
            Delay,
            config.peer,
            rng.next_u32(),
            config.response_timeout_ms,
        );

        let watcher = async {
            if let Err(e) = watch(&mut link, &MONITOR).await {
                error!("Mesh watcher stopped: {}", e);
            }
        };

        let app_logic = async {
            let Some(action) = build_action(sensor_periph, &config).await else {
                return;
            };
            info!("Heap in use: {} bytes", heap::used());
            Worker::new(&MONITOR, client, action, &config).run().await;
        };

        join4(w5500_runner.run(), net_runner.run(), watcher, app_logic).await;
    }

    fn node_config() -> NodeConfig {
        let defaults = NodeConfig::default();
        match defaults.clone().with_peer_override(option_env!("COAP_PEER")) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring COAP_PEER override: {:?}", e);
                defaults
            }
        }
    }

    #[cfg(feature = "sensor-report")]
    async fn build_action(periph: SensorPeripherals, config: &NodeConfig) -> Option<impl NodeAction> {
        use coap_node_core::SensorReport;
        use embassy_stm32::i2c::{self, I2c};
        use sensor::Hts221;

        let i2c = I2c::new(
            periph.i2c,
            periph.scl,
            periph.sda,
            Irqs,
            periph.dma_tx,
            periph.dma_rx,
            i2c::Config::default(),
        );

        match Hts221::new(i2c, Delay).await {
            Ok(sensor) => Some(SensorReport::new(sensor, config.report_path)),
            Err(e) => {
                error!("HTS221 unavailable: {}", e);
                None
            }
        }
    }

    #[cfg(feature = "resource-poll")]
    async fn build_action(_periph: SensorPeripherals, config: &NodeConfig) -> Option<impl NodeAction> {
        use coap_node_core::ResourcePoll;

        Some(ResourcePoll::new(config.poll_path))
    }

    /// USB task: CDC-ACM console and host handshake
    #[task(priority = 1)]
    async fn usb_task(_cx: usb_task::Context, periph: UsbPeripherals) {
        use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
        use embassy_usb::Builder;
        use static_cell::StaticCell;

        static EP_OUT_BUFFER: StaticCell<[u8; 256]> = StaticCell::new();
        static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
        static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
        static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
        static STATE: StaticCell<State<'static>> = StaticCell::new();

        let mut driver_config = embassy_stm32::usb::Config::default();
        driver_config.vbus_detection = false;
        let driver = embassy_stm32::usb::Driver::new_fs(
            periph.otg,
            Irqs,
            periph.dp,
            periph.dm,
            EP_OUT_BUFFER.init([0; 256]),
            driver_config,
        );

        let mut usb_config = embassy_usb::Config::new(0xc0de, 0xcafe);
        usb_config.manufacturer = Some("iot-playground");
        usb_config.product = Some("CoAP node console");
        usb_config.serial_number = Some(device_id::uid_hex());

        let mut builder = Builder::new(
            driver,
            usb_config,
            CONFIG_DESCRIPTOR.init([0; 256]),
            BOS_DESCRIPTOR.init([0; 256]),
            &mut [],
            CONTROL_BUF.init([0; 64]),
        );
        let class = CdcAcmClass::new(&mut builder, STATE.init(State::new()), 64);
        let mut device = builder.build();
        let mut line = usb::UsbSerialLine::new(class);

        let handshake = async {
            wait_for_host(&mut line, &mut Delay).await;
            line.greet().await;
        };

        join(device.run(), handshake).await;
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }
}
